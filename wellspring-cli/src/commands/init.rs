//! Init command - initialize configuration file.

use std::path::Path;

use console::style;
use wellspring::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run() -> Result<(), CliError> {
    let path = config_file_path();
    let created = write_default(&path)?;

    if created {
        println!("{} {}", style("Created").green().bold(), path.display());
    } else {
        println!(
            "{} {}",
            style("Already exists").yellow().bold(),
            path.display()
        );
    }
    println!();
    println!("Edit this file to change the Overpass endpoint, cache size or AR settings.");
    Ok(())
}

/// Write the default config at `path` unless one is there already.
fn write_default(path: &Path) -> Result<bool, CliError> {
    let created = ConfigFile::ensure_exists_at(path)?;
    if created {
        tracing::info!(path = %path.display(), "Wrote default configuration");
    }
    Ok(created)
}
