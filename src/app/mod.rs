mod batch;
mod report;
mod spin_force;
mod sweep;
mod workspace;

pub use batch::{discover_tags, find_constraint_file, Batch, BatchSummary, TagFiles};
pub use spin_force::{check_spin_force, SpinForceReport};
pub use sweep::{SweepOutcome, SweepTask, Verdict};
pub use workspace::SolverWorkspace;

use self::report::{report_batch_summary, report_spin_force};
use crate::config::{Args, Config};
use crate::io::{open_example_config, setup_output};
use crate::sphinx::SphinxBinary;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::path::Path;
use tracing::info;

pub struct SpinForceApplication {
    args: Args,
}

impl SpinForceApplication {
    pub fn from_cli() -> Self {
        Self {
            args: Args::parse(),
        }
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.log_file.as_ref(), self.args.verbose);

        if self.args.example_config {
            open_example_config()?;
            return Ok(());
        }

        let Some(config_path) = self.args.config_path() else {
            info!("No configuration file provided, use `--example-config` to see an example configuration");
            return Ok(());
        };

        let config = load_config(config_path)?;
        config.log_summary();

        let solver = SphinxBinary::validated(&config.sphinx_path)
            .wrap_err_with(|| format!("Unable to use solver '{}'", config.sphinx_path))?;
        info!("SPHInX binary used: {}", solver.command_line());

        match self.args.check_spin_force {
            Some(atom) => {
                let report = check_spin_force(
                    &solver,
                    &config.sphinx_file.working_dir,
                    atom,
                    self.args.interval,
                )?;
                report_spin_force(&report);
            }
            None => {
                let summary = Batch::new(&config, solver).run()?;
                report_batch_summary(&summary);
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    info!("Loading configuration from file {}", path.display());
    let config = Config::from_file(path)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", path.display()))?
        .resolve_paths();
    config.validate().wrap_err("Invalid configuration")?;
    info!("Loading finished");
    Ok(config)
}
