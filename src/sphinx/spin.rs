//! Spin inputs of the solver and the constraint check.

use super::{SPIN_CONSTRAINT_FILE, SPIN_INITIAL_FILE};
use crate::error::{Result, SpinForceError};
use crate::io::text::{fmt_float, parse_floats};
use nalgebra::Vector3;
use std::fs;
use std::path::Path;

/// Largest per-component deviation for which a spin constraint counts as met
pub const CONSTRAINT_TOLERANCE: f64 = 1e-5;

/// Read a collinear spin file: one value per atom.
pub fn read_spins<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_floats(&content).map_err(|value| SpinForceError::Parse {
        file: path.to_path_buf(),
        value,
    })
}

pub fn write_spins<P: AsRef<Path>>(path: P, spins: &[f64]) -> Result<()> {
    let mut content = String::with_capacity(spins.len() * 26);
    for &s in spins {
        content.push_str(&fmt_float(s));
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

/// Write the constraint targets and use them as the initial guess as well.
pub fn write_spin_inputs(working_dir: &Path, spins: &[f64]) -> Result<()> {
    let constraint = working_dir.join(SPIN_CONSTRAINT_FILE);
    write_spins(&constraint, spins)?;
    fs::copy(&constraint, working_dir.join(SPIN_INITIAL_FILE))?;
    Ok(())
}

/// Collinear spins live on the z axis.
pub fn expand_collinear(values: &[f64]) -> Vec<Vector3<f64>> {
    values.iter().map(|&z| Vector3::new(0.0, 0.0, z)).collect()
}

/// True when every component of `requested` and `reached` agrees within
/// [`CONSTRAINT_TOLERANCE`].
pub fn check_constraint(requested: &[Vector3<f64>], reached: &[Vector3<f64>]) -> bool {
    requested.len() == reached.len()
        && requested
            .iter()
            .zip(reached)
            .all(|(a, b)| (a - b).iter().all(|d| d.abs() <= CONSTRAINT_TOLERANCE))
}
