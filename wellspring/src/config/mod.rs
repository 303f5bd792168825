//! User configuration.
//!
//! Settings live in an INI file at `~/.wellspring/config.ini`:
//!
//! ```ini
//! [query]
//! endpoint = https://overpass-api.de/api/interpreter
//!
//! [cache]
//! max_entries = 50
//! expiry_secs = 300
//! ```
//!
//! A missing file means defaults. [`ConfigFile`] converts into the typed
//! configs of each component.

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, log_file_path, ConfigFileError};
pub use settings::{ArSettings, CacheSettings, ConfigFile, FetchSettings, QuerySettings};
