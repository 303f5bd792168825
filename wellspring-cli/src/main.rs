//! Wellspring CLI - Command-line interface
//!
//! Find drinking water near a coordinate and preview the AR overlay for a
//! given heading.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::nearby::NearbyArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "wellspring")]
#[command(version, about = "Find drinking water nearby", long_about = None)]
struct Cli {
    /// Mirror log output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init,

    /// Show the configuration file path and effective values
    Config,

    /// List drinking water sources around a point
    Nearby(NearbyArgs),
}

fn main() {
    let cli = Cli::parse();

    let log_path = wellspring::config::log_file_path();
    let _logging_guard = match wellspring::logging::init_logging(&log_path, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Wellspring starting");

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config => commands::config::run(),
        Commands::Nearby(args) => commands::nearby::run(args),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        e.exit();
    }
}
