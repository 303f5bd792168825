//! Config command - show where settings live and what is in effect.

use console::style;
use wellspring::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the config command.
pub fn run() -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load()?;

    let origin = if path.exists() {
        style("(loaded)").green()
    } else {
        style("(not found, using defaults)").yellow()
    };

    println!("{} {} {}", style("Config file:").bold(), path.display(), origin);
    println!();
    print!("{}", config.to_ini_string());
    Ok(())
}
