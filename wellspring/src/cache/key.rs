//! Grid-quantized cache keys.
//!
//! Viewports that differ by a few pixels should share a cache entry, so a
//! bounding box is rounded outward to a coarse grid before it becomes a key.
//! The rounded box is also what gets queried, which guarantees the cached
//! result covers every viewport that maps to the same key.

use std::fmt;

use crate::geo::{BoundingBox, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Smallest grid step accepted, in degrees (~0.1 m).
const MIN_STEP_DEG: f64 = 1e-6;

/// Cache key derived from a bounding box snapped to a grid.
///
/// Edges are stored as integer cell indices so the key is hashable and
/// immune to float formatting noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Grid step in micro-degrees.
    pub step_micro_deg: u32,
    pub south: i64,
    pub west: i64,
    pub north: i64,
    pub east: i64,
}

impl CacheKey {
    /// Snap `bounds` outward to a grid of `step_deg` cells.
    ///
    /// Returns the key together with the snapped box. A zero-height or
    /// zero-width box still spans one cell.
    pub fn quantize(bounds: &BoundingBox, step_deg: f64) -> (CacheKey, BoundingBox) {
        let step = step_deg.max(MIN_STEP_DEG);

        let south = (bounds.south / step).floor() as i64;
        let west = (bounds.west / step).floor() as i64;
        let mut north = (bounds.north / step).ceil() as i64;
        let mut east = (bounds.east / step).ceil() as i64;
        if north <= south {
            north = south + 1;
        }
        if east <= west {
            east = west + 1;
        }

        let key = CacheKey {
            step_micro_deg: (step * 1e6).round() as u32,
            south,
            west,
            north,
            east,
        };

        let snapped = BoundingBox {
            south: (south as f64 * step).max(MIN_LAT),
            west: (west as f64 * step).max(MIN_LON),
            north: (north as f64 * step).min(MAX_LAT),
            east: (east as f64 * step).min(MAX_LON),
        };

        (key, snapped)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}@{}µ°",
            self.south, self.west, self.north, self.east, self.step_micro_deg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(s: f64, w: f64, n: f64, e: f64) -> BoundingBox {
        BoundingBox::new(s, w, n, e).unwrap()
    }

    #[test]
    fn test_nearby_viewports_share_key() {
        let a = bbox(53.5512, 9.9811, 53.5588, 9.9934);
        let b = bbox(53.5514, 9.9815, 53.5586, 9.9931);

        let (key_a, _) = CacheKey::quantize(&a, 0.01);
        let (key_b, _) = CacheKey::quantize(&b, 0.01);
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn test_snapped_box_encloses_original() {
        let original = bbox(53.5512, 9.9811, 53.5588, 9.9934);
        let (_, snapped) = CacheKey::quantize(&original, 0.01);

        assert!(snapped.south <= original.south);
        assert!(snapped.west <= original.west);
        assert!(snapped.north >= original.north);
        assert!(snapped.east >= original.east);
    }

    #[test]
    fn test_different_steps_give_different_keys() {
        let b = bbox(10.0, 10.0, 10.5, 10.5);
        let (fine, _) = CacheKey::quantize(&b, 0.01);
        let (coarse, _) = CacheKey::quantize(&b, 0.02);
        assert_ne!(fine, coarse);
    }

    #[test]
    fn test_degenerate_box_spans_one_cell() {
        let point_box = bbox(10.0, 20.0, 10.0, 20.0);
        let (key, snapped) = CacheKey::quantize(&point_box, 0.01);
        assert_eq!(key.north - key.south, 1);
        assert_eq!(key.east - key.west, 1);
        assert!(snapped.area_sq_deg() > 0.0);
    }

    #[test]
    fn test_snapped_box_clamped_to_world() {
        let edge = bbox(89.995, 179.995, 90.0, 180.0);
        let (_, snapped) = CacheKey::quantize(&edge, 0.02);
        assert!(snapped.north <= MAX_LAT);
        assert!(snapped.east <= MAX_LON);
    }
}
