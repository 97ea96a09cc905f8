//! Input/Output helpers
//!
//! Logging setup, numeric text formatting and the bundled example
//! configuration.

mod example;
mod output;
pub mod text;

pub use example::{open_example_config, EXAMPLE_CONFIG};
pub use output::setup_output;
