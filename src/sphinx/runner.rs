//! Launching the solver.

use super::LOG_FILE;
use crate::error::{Result, SpinForceError};
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Substring the solver prints for `--version`
pub const VERSION_SIGNATURE: &str = "S/PHI/nX";

/// An electronic-structure solver working on the files of a directory.
pub trait Solver {
    /// Run one calculation in `working_dir` and block until it exits. The
    /// solver log must end up in [`LOG_FILE`].
    fn run(&self, working_dir: &Path) -> Result<()>;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn run(&self, working_dir: &Path) -> Result<()> {
        (**self).run(working_dir)
    }
}

/// The S/PHI/nX executable, optionally behind a launcher such as `mpirun`
#[derive(Debug, Clone)]
pub struct SphinxBinary {
    program: String,
    args: Vec<String>,
}

impl SphinxBinary {
    /// Split a command line like `mpirun -np 4 sphinx` into program and
    /// arguments.
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| SpinForceError::config("empty solver command"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Build the command and make sure it really is S/PHI/nX.
    pub fn validated(command: &str) -> Result<Self> {
        let binary = Self::new(command)?;
        binary.check_version()?;
        Ok(binary)
    }

    /// Run with `--version` and return the line carrying the signature.
    pub fn check_version(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--version")
            .output()
            .map_err(|e| SpinForceError::Solver(format!("cannot launch {}: {}", self.program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .find(|l| l.contains(VERSION_SIGNATURE))
            .map(|l| l.trim().to_string())
            .ok_or_else(|| {
                SpinForceError::config(format!("invalid SPHInX binary specified: {}", self.program))
            })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Solver for SphinxBinary {
    fn run(&self, working_dir: &Path) -> Result<()> {
        let log = File::create(working_dir.join(LOG_FILE))?;
        debug!("Running {} in {}", self.command_line(), working_dir.display());

        let status = Command::new(&self.program)
            .args(&self.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .status()
            .map_err(|e| SpinForceError::Solver(format!("cannot launch {}: {}", self.program, e)))?;

        // The log decides whether the run is usable, a non-zero exit alone is not fatal.
        if !status.success() {
            warn!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}
