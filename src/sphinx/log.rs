//! Solver log (`output.sx`) scraping: convergence status, final spins and
//! constraint multipliers.

use crate::error::{Result, SpinForceError};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;

pub const CONVERGED_MARKER: &str = "Convergence reached.";
pub const STEP_LIMIT_MARKER: &str = "Convergence not yet reached.";

lazy_static! {
    static ref STEP_RE: Regex = Regex::new(r"F\((\d+)\)=").unwrap();
    static ref NU_RE: Regex = Regex::new(r"^nu\((\d*)\)\s*=\s*(\S+)").unwrap();
    static ref SPIN_RE: Regex = Regex::new(r"^Spin of atom (\d+)\s*=\s*(\S+)").unwrap();
}

/// How the electronic minimisation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceStatus {
    pub converged: bool,
    /// The step budget ran out before convergence
    pub steps_over: bool,
    pub steps: usize,
}

/// Final spins and constraint multipliers, one scalar per atom
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintOutcome {
    pub spins: Vec<f64>,
    pub multipliers: Vec<f64>,
}

pub fn read_convergence<P: AsRef<Path>>(path: P) -> Result<ConvergenceStatus> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_convergence(&content, path)
}

/// Classify the end of the run.
///
/// Markers are tried in order: explicit convergence, explicit step limit, and
/// otherwise an abnormal end, whose step count is that of the last `F(n)=`
/// line in the log.
pub fn parse_convergence(content: &str, file: &Path) -> Result<ConvergenceStatus> {
    let lines: Vec<&str> = content.lines().collect();

    if let Some(pos) = lines.iter().position(|l| l.contains(CONVERGED_MARKER)) {
        let steps = step_before(&lines, pos, file)?;
        return Ok(ConvergenceStatus {
            converged: true,
            steps_over: false,
            steps,
        });
    }

    if let Some(pos) = lines.iter().position(|l| l.contains(STEP_LIMIT_MARKER)) {
        let steps = step_before(&lines, pos, file)?;
        return Ok(ConvergenceStatus {
            converged: false,
            steps_over: true,
            steps,
        });
    }

    let steps = step_before(&lines, lines.len(), file)?;
    Ok(ConvergenceStatus {
        converged: false,
        steps_over: false,
        steps,
    })
}

/// Step number of the nearest `F(n)=` line above line `end`.
fn step_before(lines: &[&str], end: usize, file: &Path) -> Result<usize> {
    let caps = lines[..end]
        .iter()
        .rev()
        .find_map(|l| STEP_RE.captures(l))
        .ok_or_else(|| SpinForceError::extraction(file, "iteration count F(n)="))?;

    caps[1].parse().map_err(|_| SpinForceError::Parse {
        file: file.to_path_buf(),
        value: caps[1].to_string(),
    })
}

pub fn read_final_spin_and_nu<P: AsRef<Path>>(path: P, n_atoms: usize) -> Result<ConstraintOutcome> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_final_spin_and_nu(&content, n_atoms, path)
}

/// Collect `n_atoms` multipliers (`nu(i) = x`) and spins
/// (`Spin of atom i = x`) starting at the last `nu(0)` line of the log.
pub fn parse_final_spin_and_nu(
    content: &str,
    n_atoms: usize,
    file: &Path,
) -> Result<ConstraintOutcome> {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();
    let start = lines
        .iter()
        .rposition(|l| l.starts_with("nu(0)"))
        .ok_or_else(|| SpinForceError::extraction(file, "constraint multipliers nu(0)"))?;

    let mut spins = Vec::with_capacity(n_atoms);
    let mut multipliers = Vec::with_capacity(n_atoms);

    for line in &lines[start..] {
        if spins.len() == n_atoms && multipliers.len() == n_atoms {
            break;
        }
        if let Some(caps) = NU_RE.captures(line) {
            if multipliers.len() < n_atoms {
                multipliers.push(parse_value(&caps[2], file)?);
            }
        } else if let Some(caps) = SPIN_RE.captures(line) {
            if spins.len() < n_atoms {
                spins.push(parse_value(&caps[2], file)?);
            }
        }
    }

    if multipliers.len() < n_atoms {
        return Err(SpinForceError::extraction(
            file,
            format!("{} constraint multipliers (found {})", n_atoms, multipliers.len()),
        ));
    }
    if spins.len() < n_atoms {
        return Err(SpinForceError::extraction(
            file,
            format!("{} final spins (found {})", n_atoms, spins.len()),
        ));
    }

    Ok(ConstraintOutcome { spins, multipliers })
}

fn parse_value(raw: &str, file: &Path) -> Result<f64> {
    raw.parse().map_err(|_| SpinForceError::Parse {
        file: file.to_path_buf(),
        value: raw.to_string(),
    })
}
