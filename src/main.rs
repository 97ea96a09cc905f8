//! Spin-force sweep command-line interface

use color_eyre::eyre::Result;
use spinforce::app::SpinForceApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    SpinForceApplication::from_cli().run()
}
