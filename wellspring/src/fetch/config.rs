//! Tuning for the viewport fetch controller.
//!
//! # Example Configuration (INI)
//!
//! ```ini
//! [fetch]
//! min_zoom = 12
//! debounce_base_ms = 300
//! debounce_per_level_ms = 150
//! debounce_max_ms = 1200
//! grid_step_deg = 0.01
//! overlap_threshold = 0.8
//! ```

use std::time::Duration;

/// Below this zoom level viewports are never fetched.
pub const DEFAULT_MIN_FETCH_ZOOM: f64 = 12.0;

/// Debounce delay at or above the reference zoom.
pub const DEFAULT_DEBOUNCE_BASE: Duration = Duration::from_millis(300);

/// Extra debounce delay per zoom level below the reference zoom.
pub const DEFAULT_DEBOUNCE_PER_LEVEL: Duration = Duration::from_millis(150);

/// Upper bound on the debounce delay.
pub const DEFAULT_DEBOUNCE_MAX: Duration = Duration::from_millis(1200);

/// Zoom at which the finest grid and shortest delay apply.
pub const DEFAULT_REFERENCE_ZOOM: f64 = 16.0;

/// Grid cell size at the reference zoom, in degrees.
pub const DEFAULT_GRID_STEP_DEG: f64 = 0.01;

/// Overlap fraction above which a viewport is considered already covered.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.8;

/// A new viewport larger than this multiple of the published area is
/// always fetched, regardless of overlap.
pub const DEFAULT_COMPARABLE_AREA_RATIO: f64 = 1.5;

/// Quantized viewports larger than this (square degrees) are never queried.
pub const DEFAULT_MAX_AREA_SQ_DEG: f64 = 0.25;

/// Radius searched around a freshly located user.
pub const DEFAULT_LOCATION_RADIUS_M: f64 = 1500.0;

/// Viewport fetch controller configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Viewports below this zoom are ignored.
    pub min_fetch_zoom: f64,

    /// Debounce delay at the reference zoom.
    pub debounce_base: Duration,

    /// Added per zoom level below the reference zoom.
    pub debounce_per_level: Duration,

    /// Delay ceiling.
    pub debounce_max: Duration,

    /// Zoom that maps to the base delay and base grid step.
    pub reference_zoom: f64,

    /// Grid step at the reference zoom. Doubles per coarser level.
    pub grid_step_deg: f64,

    /// Skip when the intersection covers more than this fraction of the
    /// smaller box.
    pub overlap_threshold: f64,

    /// Overlap skip only applies when the new area is at most this multiple
    /// of the published area.
    pub comparable_area_ratio: f64,

    /// Area ceiling for a quantized query box.
    pub max_area_sq_deg: f64,

    /// Radius for `Located` fetches.
    pub location_radius_m: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_fetch_zoom: DEFAULT_MIN_FETCH_ZOOM,
            debounce_base: DEFAULT_DEBOUNCE_BASE,
            debounce_per_level: DEFAULT_DEBOUNCE_PER_LEVEL,
            debounce_max: DEFAULT_DEBOUNCE_MAX,
            reference_zoom: DEFAULT_REFERENCE_ZOOM,
            grid_step_deg: DEFAULT_GRID_STEP_DEG,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            comparable_area_ratio: DEFAULT_COMPARABLE_AREA_RATIO,
            max_area_sq_deg: DEFAULT_MAX_AREA_SQ_DEG,
            location_radius_m: DEFAULT_LOCATION_RADIUS_M,
        }
    }
}

impl FetchConfig {
    /// Set the minimum fetch zoom.
    pub fn with_min_fetch_zoom(mut self, zoom: f64) -> Self {
        self.min_fetch_zoom = zoom;
        self
    }

    /// Set the debounce curve.
    pub fn with_debounce(mut self, base: Duration, per_level: Duration, max: Duration) -> Self {
        self.debounce_base = base;
        self.debounce_per_level = per_level;
        self.debounce_max = max;
        self
    }

    /// Set the grid step at the reference zoom.
    pub fn with_grid_step(mut self, step_deg: f64) -> Self {
        self.grid_step_deg = step_deg;
        self
    }

    /// Set the overlap skip thresholds.
    pub fn with_overlap(mut self, threshold: f64, comparable_area_ratio: f64) -> Self {
        self.overlap_threshold = threshold;
        self.comparable_area_ratio = comparable_area_ratio;
        self
    }

    /// Set the quantized area ceiling.
    pub fn with_max_area(mut self, max_area_sq_deg: f64) -> Self {
        self.max_area_sq_deg = max_area_sq_deg;
        self
    }

    /// Set the radius for location fetches.
    pub fn with_location_radius(mut self, radius_m: f64) -> Self {
        self.location_radius_m = radius_m;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.min_fetch_zoom, 12.0);
        assert!(config.debounce_base <= config.debounce_max);
        assert!(config.overlap_threshold > 0.0 && config.overlap_threshold < 1.0);
        assert!(config.comparable_area_ratio >= 1.0);
    }

    #[test]
    fn test_builders() {
        let config = FetchConfig::default()
            .with_min_fetch_zoom(10.0)
            .with_grid_step(0.05)
            .with_overlap(0.9, 2.0)
            .with_max_area(1.0)
            .with_location_radius(500.0);

        assert_eq!(config.min_fetch_zoom, 10.0);
        assert_eq!(config.grid_step_deg, 0.05);
        assert_eq!(config.overlap_threshold, 0.9);
        assert_eq!(config.comparable_area_ratio, 2.0);
        assert_eq!(config.max_area_sq_deg, 1.0);
        assert_eq!(config.location_radius_m, 500.0);
    }
}
