//! `energy.dat`: one line per SCF step, the last one holds the final values.

use crate::error::{Result, SpinForceError};
use std::fs;
use std::path::Path;

/// Hartree to eV, as used for the smearing estimate
const HARTREE_TO_EV: f64 = 27.21;

pub fn read_final_energy<P: AsRef<Path>>(path: P) -> Result<f64> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_final_energy(&content, path)
}

/// Total energy (Hartree), fifth column of the last line.
pub fn parse_final_energy(content: &str, file: &Path) -> Result<f64> {
    last_line_column(content, 4, file, "final energy")
}

/// Smearing error estimate (eV): half the gap between the free energy and the
/// zero-smearing energy of the last step.
pub fn parse_smearing_error(content: &str, file: &Path) -> Result<f64> {
    let free = last_line_column(content, 2, file, "free energy")?;
    let zero = last_line_column(content, 3, file, "zero-smearing energy")?;
    Ok((free - zero).abs() * HARTREE_TO_EV / 2.0)
}

fn last_line_column(content: &str, column: usize, file: &Path, what: &str) -> Result<f64> {
    let token = content
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .and_then(|l| l.split_whitespace().nth(column))
        .ok_or_else(|| SpinForceError::extraction(file, what))?;

    token.parse().map_err(|_| SpinForceError::Parse {
        file: file.to_path_buf(),
        value: token.to_string(),
    })
}
