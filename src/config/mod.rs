//! Configuration management for spin-constraint sweeps
//!
//! This module holds the batch configuration (file-system layout, solver
//! binary, dataset output) and the per-tag spin-constraint description. All
//! structures are plain data; [`Config::log_summary`] reports them once they
//! are fully resolved.

mod args;

pub use args::Args;

use crate::error::{Result, SpinForceError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Affine parameter used to turn spins into pseudo-coordinates
pub const DEFAULT_AFFINE_PARAMETER: f64 = 0.5;

/// Main configuration structure for a sweep batch
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub sphinx_file: SphinxFiles,
    pub dp_file: DpFiles,
    pub sphinx_path: String,
    #[serde(default)]
    pub spin_constraint: Option<SpinConstraint>,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Locations of the solver inputs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SphinxFiles {
    pub working_dir: PathBuf,
    pub structure_dir: PathBuf,
    pub spin_dir: PathBuf,
    pub config_dir: PathBuf,
    pub input_path: PathBuf,
}

/// Dataset output settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DpFiles {
    pub output_dir: PathBuf,
    #[serde(default = "default_affine_parameter")]
    pub affine_parameter: f64,
}

fn default_affine_parameter() -> f64 {
    DEFAULT_AFFINE_PARAMETER
}

/// Spin constraints applied to one tag
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpinConstraint {
    pub collinear: bool,
    pub atoms: Vec<AtomConstraint>,
}

/// Sampling rule for a single constrained atom
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AtomConstraint {
    pub index: usize,
    pub sampling: String,
    pub bound: Bound,
}

/// Bounds of the sampled spin values
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Bound {
    pub low: f64,
    pub high: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<usize>,
}

impl Config {
    /// Load a configuration file. Files ending in `.yaml`/`.yml` are parsed as
    /// YAML, everything else as JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        if is_yaml {
            serde_yml::from_str(&content).map_err(|e| {
                SpinForceError::config(format!("{}: {}", path.display(), e))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                SpinForceError::config(format!("{}: {}", path.display(), e))
            })
        }
    }

    /// Join every relative path onto the working directory.
    pub fn resolve_paths(mut self) -> Self {
        let wd = self.sphinx_file.working_dir.clone();
        let join = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                wd.join(p)
            }
        };

        self.sphinx_file.structure_dir = join(&self.sphinx_file.structure_dir);
        self.sphinx_file.spin_dir = join(&self.sphinx_file.spin_dir);
        self.sphinx_file.config_dir = join(&self.sphinx_file.config_dir);
        self.sphinx_file.input_path = join(&self.sphinx_file.input_path);
        self.dp_file.output_dir = join(&self.dp_file.output_dir);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.dp_file.affine_parameter.is_finite() {
            return Err(SpinForceError::config("affine_parameter must be finite"));
        }
        if self.sphinx_path.trim().is_empty() {
            return Err(SpinForceError::config("sphinx_path is empty"));
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        let files = &self.sphinx_file;
        info!("Working directory: {}", files.working_dir.display());
        info!("Structure files at {}", files.structure_dir.display());
        info!("Spin files at {}", files.spin_dir.display());
        info!("Constraint files at {}", files.config_dir.display());
        info!("Input file template: {}", files.input_path.display());
        info!("Output raw files at {}", self.dp_file.output_dir.display());
        info!("Solver command: {}", self.sphinx_path);
        info!(
            "Pseudo-coordinate affine parameter: {}",
            self.dp_file.affine_parameter
        );
        match &self.spin_constraint {
            Some(c) => info!(
                "Default constraint: {} atom(s), collinear={}",
                c.atoms.len(),
                c.collinear
            ),
            None => info!("No default constraint, every tag needs its own file"),
        }
        if let Some(seed) = self.random_seed {
            info!("Random sampling seed: {}", seed);
        }
    }
}

impl SpinConstraint {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SpinForceError::config(format!("{}: {}", path.display(), e)))
    }

    /// Check the constraint against a structure with `n_atoms` atoms.
    pub fn validate(&self, n_atoms: usize) -> Result<()> {
        if !self.collinear {
            return Err(SpinForceError::config(
                "non-collinear spin constraints are not supported",
            ));
        }
        for (i, atom) in self.atoms.iter().enumerate() {
            if atom.index >= n_atoms {
                return Err(SpinForceError::config(format!(
                    "constrained atom index {} out of range for {} atoms",
                    atom.index, n_atoms
                )));
            }
            if self.atoms[..i].iter().any(|a| a.index == atom.index) {
                return Err(SpinForceError::config(format!(
                    "atom {} is constrained more than once",
                    atom.index
                )));
            }
        }
        Ok(())
    }

    pub fn indices(&self) -> Vec<usize> {
        self.atoms.iter().map(|a| a.index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const CONFIG_JSON: &str = r#"{
        "sphinx_file": {
            "working_dir": "/scratch/run",
            "structure_dir": "structures",
            "spin_dir": "/data/spins",
            "config_dir": "constraints",
            "input_path": "input.sx"
        },
        "dp_file": { "output_dir": "raw" },
        "sphinx_path": "sphinx",
        "spin_constraint": {
            "collinear": true,
            "atoms": [
                { "index": 0, "sampling": "uniform",
                  "bound": { "low": -1.0, "high": 1.0, "points": 3 } }
            ]
        }
    }"#;

    #[test]
    fn test_parse_json_config() {
        let config: Config = serde_json::from_str(CONFIG_JSON).unwrap();
        assert_eq!(config.dp_file.affine_parameter, DEFAULT_AFFINE_PARAMETER);
        assert_eq!(config.random_seed, None);
        let constraint = config.spin_constraint.unwrap();
        assert!(constraint.collinear);
        assert_eq!(constraint.atoms[0].bound.points, Some(3));
        assert_eq!(constraint.atoms[0].bound.interval, None);
    }

    #[test]
    fn test_resolve_paths() {
        let config: Config = serde_json::from_str(CONFIG_JSON).unwrap();
        let config = config.resolve_paths();
        let files = &config.sphinx_file;
        assert_eq!(files.structure_dir, PathBuf::from("/scratch/run/structures"));
        assert_eq!(files.spin_dir, PathBuf::from("/data/spins"));
        assert_eq!(files.input_path, PathBuf::from("/scratch/run/input.sx"));
        assert_eq!(config.dp_file.output_dir, PathBuf::from("/scratch/run/raw"));
    }

    #[test]
    fn test_yaml_config_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "sphinx_file:\n  working_dir: wd\n  structure_dir: s\n  spin_dir: sp\n  config_dir: c\n  input_path: input.sx\ndp_file:\n  output_dir: out\n  affine_parameter: 0.25\nsphinx_path: sphinx\nrandom_seed: 7\n"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.dp_file.affine_parameter, 0.25);
        assert_eq!(config.random_seed, Some(7));
        assert!(config.spin_constraint.is_none());
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{ \"dp_file\": {{}} }}").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SpinForceError::Config(_)));
    }

    #[test]
    fn test_constraint_validation() {
        let config: Config = serde_json::from_str(CONFIG_JSON).unwrap();
        let mut constraint = config.spin_constraint.unwrap();
        assert!(constraint.validate(1).is_ok());
        assert!(constraint.validate(0).is_err());

        constraint.atoms.push(constraint.atoms[0].clone());
        assert!(constraint.validate(2).is_err());

        constraint.atoms.pop();
        constraint.collinear = false;
        assert!(matches!(
            constraint.validate(1),
            Err(SpinForceError::Config(_))
        ));
    }
}
