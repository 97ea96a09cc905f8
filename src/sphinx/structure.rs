//! Structure (`structure.sx`) and force (`forces.sx`) files.
//!
//! Both files list atoms grouped by species: an `element = "X";` line opens a
//! new species and every following atom record belongs to it. Records are
//! matched line by line; `//` comment lines are ignored.

use crate::error::{Result, SpinForceError};
use lazy_static::lazy_static;
use nalgebra::{Matrix3, Vector3};
use regex::Regex;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref CELL_RE: Regex = Regex::new(r"(?s)\bcell\s*=\s*(.*?)\s*;").unwrap();
    static ref ELEMENT_RE: Regex = Regex::new(r#"element\s*=\s*"(.*)"\s*;"#).unwrap();
    static ref COORDS_RE: Regex = Regex::new(r"atom\s*\{\s*coords\s*=(.*?)\s*;").unwrap();
    static ref FORCE_RE: Regex = Regex::new(r"force\s*=(.*?)\s*;").unwrap();
}

/// Atom records of one species, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub element: String,
    pub records: Vec<Vector3<f64>>,
}

/// Cell and absolute atomic positions, Bohr
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    /// Lattice vectors as rows
    pub cell: Matrix3<f64>,
    pub species: Vec<Species>,
}

impl Structure {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        parse_structure(&content, path)
    }

    pub fn n_atoms(&self) -> usize {
        self.species.iter().map(|s| s.records.len()).sum()
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        flatten(&self.species)
    }

    /// Species index of every atom
    pub fn atom_types(&self) -> Vec<usize> {
        self.species
            .iter()
            .enumerate()
            .flat_map(|(t, s)| std::iter::repeat(t).take(s.records.len()))
            .collect()
    }
}

pub fn parse_structure(content: &str, file: &Path) -> Result<Structure> {
    let cell = parse_cell(content, file)?;
    let species = scan_atomwise(content, &COORDS_RE, Some(&cell), file)?;
    Ok(Structure { cell, species })
}

/// Read per-atom forces from `forces.sx`, flattened in species order.
pub fn read_forces<P: AsRef<Path>>(path: P) -> Result<Vec<Vector3<f64>>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_forces(&content, path)
}

pub fn parse_forces(content: &str, file: &Path) -> Result<Vec<Vector3<f64>>> {
    let species = scan_atomwise(content, &FORCE_RE, None, file)?;
    Ok(flatten(&species))
}

fn parse_cell(content: &str, file: &Path) -> Result<Matrix3<f64>> {
    let raw = CELL_RE
        .captures(content)
        .and_then(|c| c.get(1))
        .ok_or_else(|| SpinForceError::extraction(file, "cell"))?
        .as_str()
        .replace(|c: char| matches!(c, '[' | ']' | '\n' | '\r'), "");

    let values = parse_list(&raw, file)?;
    if values.len() != 9 {
        return Err(SpinForceError::extraction(
            file,
            format!("3x3 cell (found {} components)", values.len()),
        ));
    }
    Ok(Matrix3::from_row_slice(&values))
}

/// Line scan bucketing every `record` match under the most recent species.
/// Records flagged `relative` are converted to absolute positions when a cell
/// is given.
fn scan_atomwise(
    content: &str,
    record: &Regex,
    cell: Option<&Matrix3<f64>>,
    file: &Path,
) -> Result<Vec<Species>> {
    let mut species: Vec<Species> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with("//") {
            continue;
        }

        if let Some(caps) = ELEMENT_RE.captures(line) {
            species.push(Species {
                element: caps[1].to_string(),
                records: Vec::new(),
            });
        } else if let Some(caps) = record.captures(line) {
            let raw = caps[1].trim_matches(|c: char| c.is_whitespace() || c == '[' || c == ']');
            let values = parse_list(raw, file)?;
            if values.len() != 3 {
                return Err(SpinForceError::extraction(
                    file,
                    format!("3-vector in line '{}'", line),
                ));
            }
            let mut entry = Vector3::new(values[0], values[1], values[2]);
            if let Some(cell) = cell {
                if line.contains("relative") {
                    entry = cell.transpose() * entry;
                }
            }

            let current = species.last_mut().ok_or_else(|| {
                SpinForceError::extraction(
                    file,
                    format!("element declaration before '{}'", line),
                )
            })?;
            current.records.push(entry);
        }
    }

    Ok(species)
}

fn parse_list(raw: &str, file: &Path) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| SpinForceError::Parse {
                file: file.to_path_buf(),
                value: s.to_string(),
            })
        })
        .collect()
}

fn flatten(species: &[Species]) -> Vec<Vector3<f64>> {
    species
        .iter()
        .flat_map(|s| s.records.iter().copied())
        .collect()
}
