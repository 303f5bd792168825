//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use wellspring::config::ConfigFileError;
use wellspring::geo::GeoError;
use wellspring::query::QueryError;
use wellspring::WellspringError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// A command-line value is out of range
    InvalidArgument { name: &'static str, reason: String },
    /// Error from the library
    Core(WellspringError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Core(WellspringError::Query(QueryError::Status { status: 429, .. })) => {
                eprintln!();
                eprintln!("The Overpass server is rate limiting requests.");
                eprintln!("Wait a minute and try again, or set another endpoint");
                eprintln!("in the [query] section of the config file.");
            }
            CliError::Core(WellspringError::Query(QueryError::Timeout { .. })) => {
                eprintln!();
                eprintln!("Try a smaller --radius or raise timeout_secs in the config file.");
            }
            _ => {}
        }

        process::exit(1)
    }

    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::InvalidArgument { name, reason } => {
                write!(f, "Invalid --{}: {}", name, reason)
            }
            CliError::Core(WellspringError::Config(e)) => write!(f, "Configuration error: {}", e),
            CliError::Core(WellspringError::Query(e)) => {
                write!(f, "Could not load drinking water sources: {}", e)
            }
            CliError::Core(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WellspringError> for CliError {
    fn from(e: WellspringError) -> Self {
        CliError::Core(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Core(e.into())
    }
}

impl From<GeoError> for CliError {
    fn from(e: GeoError) -> Self {
        CliError::Core(e.into())
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        CliError::Core(e.into())
    }
}
