//! Bundled example configuration

use color_eyre::eyre::{eyre, Result, WrapErr};
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

pub const EXAMPLE_CONFIG: &str = include_str!("../../configs/spinforce.json");

/// Write the example configuration to a kept temporary file and open it in
/// `$EDITOR` (`vim` when unset). Returns the path of the written copy.
pub fn open_example_config() -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("spinforce-example-")
        .suffix(".json")
        .tempfile()
        .wrap_err("Unable to create a temporary file for the example configuration")?;
    file.write_all(EXAMPLE_CONFIG.as_bytes())?;
    let path = file
        .into_temp_path()
        .keep()
        .wrap_err("Unable to keep the example configuration file")?;
    info!("Example configuration written to {}", path.display());

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| eyre!("$EDITOR is set but empty"))?;

    let status = Command::new(program)
        .args(parts)
        .arg(&path)
        .status()
        .wrap_err_with(|| format!("Unable to launch editor '{}'", editor))?;
    if !status.success() {
        return Err(eyre!("Editor '{}' exited with {}", editor, status));
    }

    Ok(path)
}
