//! Error type shared by the library modules.
//!
//! Everything here is fatal for a batch: configuration problems, text that the
//! solver was expected to write but did not, and I/O failures. A sample that
//! simply fails to converge is not an error and never reaches this type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpinForceError {
    /// Missing or contradictory settings in a configuration or constraint file
    #[error("configuration error: {0}")]
    Config(String),

    /// An expected pattern was not found in a solver file
    #[error("could not extract {what} from {}", file.display())]
    Extraction { file: PathBuf, what: String },

    /// A number inside a matched pattern did not parse
    #[error("malformed number '{value}' in {}", file.display())]
    Parse { file: PathBuf, value: String },

    /// The solver binary could not be launched or rejected its input
    #[error("solver error: {0}")]
    Solver(String),

    /// Atom-type layout differs from the first frame of the dataset
    #[error("atom type layout of frame {frame} differs from the first frame")]
    TypeMismatch { frame: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpinForceError {
    pub fn config(msg: impl Into<String>) -> Self {
        SpinForceError::Config(msg.into())
    }

    pub fn extraction(file: impl Into<PathBuf>, what: impl Into<String>) -> Self {
        SpinForceError::Extraction {
            file: file.into(),
            what: what.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpinForceError>;
