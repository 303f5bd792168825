//! CLI command implementations.
//!
//! - [`init`] - Configuration initialization
//! - [`config`] - Configuration display
//! - [`nearby`] - Point query with AR preview

pub mod config;
pub mod init;
pub mod nearby;
