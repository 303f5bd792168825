//! Points of interest returned by spatial queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::geo::GeoPoint;

/// Display name used when the source carries no `name` tag.
pub const DEFAULT_DISPLAY_NAME: &str = "Drinking water";

/// A single drinking-water source.
///
/// Immutable once received from a query; identity is the source id.
#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    /// Source identifier (e.g. `node/123456`).
    pub id: String,
    /// Location of the marker.
    pub position: GeoPoint,
    /// Human-readable label.
    pub display_name: String,
    /// Optional source tags (`bottle=yes`, `fee=no`, ...).
    pub attributes: BTreeMap<String, String>,
}

impl PointOfInterest {
    /// Create a point with no attributes.
    pub fn new(id: impl Into<String>, position: GeoPoint, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position,
            display_name: display_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Attach source tags.
    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Look up a single tag.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Shared, immutable sequence of points as produced by one query.
///
/// Cache entries and the published set share the same allocation.
pub type PoiList = Arc<Vec<PointOfInterest>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup() {
        let mut tags = BTreeMap::new();
        tags.insert("bottle".to_string(), "yes".to_string());

        let poi = PointOfInterest::new(
            "node/1",
            GeoPoint::new(48.0, 11.0).unwrap(),
            DEFAULT_DISPLAY_NAME,
        )
        .with_attributes(tags);

        assert_eq!(poi.attribute("bottle"), Some("yes"));
        assert_eq!(poi.attribute("fee"), None);
    }
}
