//! Great-circle geometry.
//!
//! Provides the distance, bearing and angle helpers used by both the AR
//! projection and the viewport fetch heuristics. All coordinates are WGS-84
//! latitude/longitude in degrees.

mod types;

pub use types::{
    BoundingBox, GeoError, GeoPoint, EARTH_RADIUS_M, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON,
};

/// Great-circle distance between two points in meters (haversine).
///
/// Non-negative and symmetric; zero for identical points.
#[inline]
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1.0 for antipodal points
    2.0 * EARTH_RADIUS_M * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Initial bearing along the great circle from `from` toward `to`.
///
/// Returns degrees in [0, 360), clockwise from true north. Identical points
/// yield 0.0.
#[inline]
pub fn initial_bearing_degrees(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_bearing(x.atan2(y).to_degrees())
}

/// Normalize an angle to the range (-180, 180].
///
/// Used to express a bearing relative to the current heading.
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle % 360.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Normalize an angle to the compass range [0, 360).
#[inline]
pub fn normalize_bearing(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
