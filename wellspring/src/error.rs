//! Crate-level error type.
//!
//! Each module has its own error enum; [`WellspringError`] unifies them for
//! callers that drive several components.

use thiserror::Error;

use crate::ar::ArError;
use crate::config::ConfigFileError;
use crate::geo::GeoError;
use crate::location::LocationError;
use crate::query::QueryError;

#[derive(Debug, Error)]
pub enum WellspringError {
    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Ar(#[from] ArError),

    #[error(transparent)]
    Config(#[from] ConfigFileError),
}

impl WellspringError {
    /// Whether the user should be told about this error.
    ///
    /// A cancelled query only means newer intent superseded it.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, WellspringError::Query(QueryError::Cancelled))
    }
}

pub type Result<T> = std::result::Result<T, WellspringError>;
