//! Spin-constrained S/PHI/nX sweeps collected into DeePMD raw datasets.
//!
//! A batch walks over tagged structures, samples spin configurations for the
//! constrained atoms, runs the solver once per configuration and appends every
//! acceptable result as one frame of the dataset.

pub mod app;
pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod sampling;
pub mod sphinx;

pub use error::{Result, SpinForceError};
