//! Overpass API spatial query client.
//!
//! Sends an Overpass QL query for every node/way/relation carrying the
//! configured `amenity` tag inside the requested area and decodes the JSON
//! answer into [`PointOfInterest`] values.
//!
//! # Query shape
//!
//! ```text
//! [out:json][timeout:25];
//! nwr["amenity"="drinking_water"](south,west,north,east);
//! out center tags;
//! ```
//!
//! Ways and relations come back with a `center` instead of `lat`/`lon`.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{QueryConfig, QueryError, QueryRequest, SpatialQuery};
use crate::geo::GeoPoint;
use crate::poi::{PointOfInterest, DEFAULT_DISPLAY_NAME};

/// Identifies this client to the public Overpass instances.
const USER_AGENT: &str = concat!("wellspring/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    fn into_poi(self) -> Option<PointOfInterest> {
        let (lat, lon) = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(center)) => (center.lat, center.lon),
            _ => return None,
        };
        let position = GeoPoint::new(lat, lon).ok()?;

        let display_name = self
            .tags
            .get("name")
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        Some(
            PointOfInterest::new(format!("{}/{}", self.kind, self.id), position, display_name)
                .with_attributes(self.tags),
        )
    }
}

/// Decode an Overpass JSON body.
///
/// Elements without usable coordinates are skipped rather than failing the
/// whole response.
pub fn parse_response(body: &[u8]) -> Result<Vec<PointOfInterest>, QueryError> {
    let response: OverpassResponse =
        serde_json::from_slice(body).map_err(|e| QueryError::Decode(e.to_string()))?;

    let total = response.elements.len();
    let points: Vec<PointOfInterest> = response
        .elements
        .into_iter()
        .filter_map(OverpassElement::into_poi)
        .collect();

    if points.len() < total {
        debug!(
            total,
            kept = points.len(),
            "Skipped Overpass elements without coordinates"
        );
    }

    Ok(points)
}

/// Spatial query backed by an Overpass API interpreter.
pub struct OverpassClient {
    client: reqwest::Client,
    config: QueryConfig,
}

impl OverpassClient {
    /// Create a client; the request timeout comes from `config`.
    pub fn new(config: QueryConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| QueryError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the Overpass QL text for a request.
    pub fn build_query(&self, request: &QueryRequest) -> String {
        let area = match request {
            QueryRequest::Bounds(b) => {
                format!("({:.6},{:.6},{:.6},{:.6})", b.south, b.west, b.north, b.east)
            }
            QueryRequest::Around { center, radius_m } => format!(
                "(around:{:.0},{:.6},{:.6})",
                radius_m, center.latitude, center.longitude
            ),
        };

        format!(
            "[out:json][timeout:{}];nwr[\"amenity\"=\"{}\"]{};out center tags;",
            self.config.timeout.as_secs().max(1),
            self.config.amenity,
            area
        )
    }

    async fn execute(&self, query: String) -> Result<Vec<PointOfInterest>, QueryError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Spatial query rejected");
            return Err(QueryError::Status {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unexpected status")
                    .to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        parse_response(&body)
    }

    fn map_transport_error(&self, error: reqwest::Error) -> QueryError {
        if error.is_timeout() {
            QueryError::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else {
            warn!(
                error = %error,
                is_connect = error.is_connect(),
                "Spatial query transport failure"
            );
            QueryError::Transport(error.to_string())
        }
    }
}

impl SpatialQuery for OverpassClient {
    fn query(
        &self,
        request: QueryRequest,
        cancellation: CancellationToken,
    ) -> BoxFuture<'_, Result<Vec<PointOfInterest>, QueryError>> {
        let query = self.build_query(&request);
        Box::pin(async move {
            debug!(query = %query, "Sending Overpass query");
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => Err(QueryError::Cancelled),
                result = self.execute(query) => result,
            }
        })
    }

    fn name(&self) -> &str {
        "overpass"
    }
}
