//! Command-line argument parsing

use clap::Parser;
use std::path::{Path, PathBuf};

/// Calculate spin forces with S/PHI/nX and collect them as DeePMD raw files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the JSON (or YAML) configuration file
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the configuration file, takes precedence over the positional one
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    pub config_option: Option<PathBuf>,

    /// Open the bundled example configuration in $EDITOR
    #[arg(long, alias = "example_config")]
    pub example_config: bool,

    /// Write log output to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<String>,

    /// Enable debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Compare the constraint multiplier of this atom with a finite-difference
    /// spin force instead of running the sweep
    #[arg(long, value_name = "ATOM")]
    pub check_spin_force: Option<usize>,

    /// Spin interval of the finite-difference check
    #[arg(long, default_value_t = 0.01)]
    pub interval: f64,
}

impl Args {
    pub fn config_path(&self) -> Option<&Path> {
        self.config_option
            .as_deref()
            .or(self.config.as_deref())
    }
}
