//! Geographic type definitions

use std::fmt;

use thiserror::Error;

/// Valid latitude range (WGS-84 degrees)
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Mean Earth radius in meters (WGS-84 mean).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Errors raised when constructing geographic values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    #[error("Invalid bounds: north {north} is south of {south}")]
    InvertedLatitude { south: f64, north: f64 },

    /// West edge east of the east edge, i.e. the box crosses the antimeridian.
    #[error("Bounds crossing the antimeridian are not supported (west {west}, east {east})")]
    AntimeridianCrossing { west: f64, east: f64 },
}

/// A position on the WGS-84 ellipsoid, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a validated point.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}°, {:.5}°", self.latitude, self.longitude)
    }
}

/// Axis-aligned geographic box in degrees.
///
/// `north >= south` and `west <= east` always hold for a constructed box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, GeoError> {
        for lat in [south, north] {
            if !(MIN_LAT..=MAX_LAT).contains(&lat) {
                return Err(GeoError::InvalidLatitude(lat));
            }
        }
        for lon in [west, east] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(GeoError::InvalidLongitude(lon));
            }
        }
        if north < south {
            return Err(GeoError::InvertedLatitude { south, north });
        }
        if west > east {
            return Err(GeoError::AntimeridianCrossing { west, east });
        }
        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    /// Smallest box enclosing a circle of `radius_m` around `center`.
    ///
    /// The result is clamped to the valid coordinate range.
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let radius_m = radius_m.max(0.0);
        let dlat = (radius_m / EARTH_RADIUS_M).to_degrees();
        // Near the poles the longitude span blows up; clamp to the full range.
        let cos_lat = center.latitude.to_radians().cos().max(1e-9);
        let dlon = (dlat / cos_lat).min(MAX_LON);

        Self {
            south: (center.latitude - dlat).max(MIN_LAT),
            west: (center.longitude - dlon).max(MIN_LON),
            north: (center.latitude + dlat).min(MAX_LAT),
            east: (center.longitude + dlon).min(MAX_LON),
        }
    }

    /// Area in square degrees.
    #[inline]
    pub fn area_sq_deg(&self) -> f64 {
        (self.north - self.south) * (self.east - self.west)
    }

    /// Geometric center of the box.
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            latitude: (self.south + self.north) / 2.0,
            longitude: (self.west + self.east) / 2.0,
        }
    }

    /// Whether the point lies inside the box (edges inclusive).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }

    /// Overlapping region of two boxes, if they overlap at all.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let south = self.south.max(other.south);
        let north = self.north.min(other.north);
        let west = self.west.max(other.west);
        let east = self.east.min(other.east);

        if south > north || west > east {
            return None;
        }

        Some(BoundingBox {
            south,
            west,
            north,
            east,
        })
    }

    /// Fraction of the smaller box's area covered by the intersection.
    ///
    /// Returns 0.0 when the boxes are disjoint. Degenerate (zero-area) boxes
    /// count as fully covered when they lie inside the other box.
    pub fn overlap_fraction(&self, other: &BoundingBox) -> f64 {
        let Some(shared) = self.intersection(other) else {
            return 0.0;
        };

        let smaller = self.area_sq_deg().min(other.area_sq_deg());
        if smaller <= f64::EPSILON {
            return 1.0;
        }

        (shared.area_sq_deg() / smaller).clamp(0.0, 1.0)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}, {:.4}]",
            self.south, self.west, self.north, self.east
        )
    }
}
