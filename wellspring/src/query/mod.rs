//! Spatial query abstraction.
//!
//! The remote point-of-interest source is an opaque asynchronous call with
//! cooperative cancellation. The fetch controller depends only on the
//! [`SpatialQuery`] trait; [`OverpassClient`] is the production
//! implementation and tests substitute scripted mocks.

mod overpass;

pub use overpass::{parse_response, OverpassClient};

use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::geo::{BoundingBox, GeoPoint};
use crate::poi::PointOfInterest;

/// Default Overpass API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Default request-level timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(25);

/// Default `amenity` tag value to search for.
pub const DEFAULT_AMENITY: &str = "drinking_water";

/// Area to search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryRequest {
    /// Everything inside a bounding box.
    Bounds(BoundingBox),
    /// Everything within `radius_m` of `center`.
    Around { center: GeoPoint, radius_m: f64 },
}

impl QueryRequest {
    /// Bounding box enclosing the requested area.
    pub fn bounds(&self) -> BoundingBox {
        match self {
            QueryRequest::Bounds(bounds) => *bounds,
            QueryRequest::Around { center, radius_m } => BoundingBox::around(*center, *radius_m),
        }
    }
}

/// Errors from a spatial query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The request was superseded; not a fault.
    #[error("Request cancelled")]
    Cancelled,

    /// The source answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request-level timeout elapsed.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Connection or protocol failure before a status was received.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl QueryError {
    /// HTTP-like status code for this failure, if one applies.
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::Status { status, .. } => Some(*status),
            QueryError::Timeout { .. } => Some(504),
            _ => None,
        }
    }

    /// Whether this is the expected consequence of a newer request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryError::Cancelled)
    }
}

/// Remote source of points of interest.
///
/// Implementations must return [`QueryError::Cancelled`] promptly once
/// `cancellation` fires and must not retry on their own.
pub trait SpatialQuery: Send + Sync {
    /// Run one query.
    fn query(
        &self,
        request: QueryRequest,
        cancellation: CancellationToken,
    ) -> BoxFuture<'_, Result<Vec<PointOfInterest>, QueryError>>;

    /// Short name for logging.
    fn name(&self) -> &str;
}

/// Connection settings for the spatial query source.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    /// Interpreter endpoint URL.
    pub endpoint: String,
    /// Request-level timeout.
    pub timeout: Duration,
    /// `amenity` tag value to match.
    pub amenity: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_QUERY_TIMEOUT,
            amenity: DEFAULT_AMENITY.to_string(),
        }
    }
}
