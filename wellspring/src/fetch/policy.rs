//! Pure decision rules for viewport fetching.
//!
//! Kept free of timers and I/O so that the controller's behavior can be
//! checked one rule at a time.

use std::time::Duration;

use super::config::FetchConfig;
use crate::geo::BoundingBox;

/// Zoom levels below the reference zoom, never negative.
fn levels_below_reference(config: &FetchConfig, zoom: f64) -> f64 {
    (config.reference_zoom - zoom).max(0.0)
}

/// Debounce delay for a viewport event at `zoom`.
///
/// Non-increasing in zoom: coarser views wait longer before fetching.
pub fn debounce_delay(config: &FetchConfig, zoom: f64) -> Duration {
    let levels = if zoom.is_finite() {
        levels_below_reference(config, zoom)
    } else {
        0.0
    };
    let nanos = config.debounce_base.as_nanos() as f64
        + config.debounce_per_level.as_nanos() as f64 * levels;
    let capped = nanos.min(config.debounce_max.as_nanos() as f64);
    Duration::from_nanos(capped as u64)
}

/// Quantization grid step for a viewport at `zoom`.
///
/// The base step doubles for every whole zoom level below the reference.
pub fn grid_step(config: &FetchConfig, zoom: f64) -> f64 {
    let levels = if zoom.is_finite() {
        (config.reference_zoom - zoom.floor()).max(0.0)
    } else {
        0.0
    };
    // 2^31 degrees is already larger than the world
    config.grid_step_deg * 2f64.powi(levels.min(31.0) as i32)
}

/// Whether `candidate` is already covered by the published set's box.
///
/// True only when a published box exists, the candidate is not much larger
/// than it, and their intersection covers more than the threshold of the
/// smaller box.
pub fn should_skip_overlap(
    config: &FetchConfig,
    candidate: &BoundingBox,
    published: Option<&BoundingBox>,
) -> bool {
    let Some(published) = published else {
        return false;
    };

    let comparable =
        candidate.area_sq_deg() <= config.comparable_area_ratio * published.area_sq_deg();

    comparable && candidate.overlap_fraction(published) > config.overlap_threshold
}

/// Whether a quantized query box is too large to request.
pub fn exceeds_area_ceiling(config: &FetchConfig, quantized: &BoundingBox) -> bool {
    quantized.area_sq_deg() > config.max_area_sq_deg
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bbox(s: f64, w: f64, n: f64, e: f64) -> BoundingBox {
        BoundingBox::new(s, w, n, e).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Debounce
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_debounce_at_reference_zoom_is_base() {
        let config = FetchConfig::default();
        assert_eq!(
            debounce_delay(&config, config.reference_zoom),
            config.debounce_base
        );
        assert_eq!(debounce_delay(&config, 19.0), config.debounce_base);
    }

    #[test]
    fn test_debounce_grows_when_zoomed_out() {
        let config = FetchConfig::default();
        let near = debounce_delay(&config, 15.0);
        let far = debounce_delay(&config, 13.0);
        assert_eq!(near, Duration::from_millis(450));
        assert_eq!(far, Duration::from_millis(750));
    }

    #[test]
    fn test_debounce_is_capped() {
        let config = FetchConfig::default();
        assert_eq!(debounce_delay(&config, 1.0), config.debounce_max);
    }

    #[test]
    fn test_debounce_non_finite_zoom() {
        let config = FetchConfig::default();
        assert_eq!(debounce_delay(&config, f64::NAN), config.debounce_base);
    }

    proptest! {
        #[test]
        fn prop_debounce_non_increasing(a in 0.0f64..22.0, b in 0.0f64..22.0) {
            let config = FetchConfig::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(debounce_delay(&config, lo) >= debounce_delay(&config, hi));
        }

        #[test]
        fn prop_grid_step_non_increasing(a in 0.0f64..22.0, b in 0.0f64..22.0) {
            let config = FetchConfig::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(grid_step(&config, lo) >= grid_step(&config, hi));
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grid step
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_grid_step_doubles_per_level() {
        let config = FetchConfig::default();
        assert_eq!(grid_step(&config, 16.0), 0.01);
        assert_eq!(grid_step(&config, 15.0), 0.02);
        assert_eq!(grid_step(&config, 14.5), 0.04);
        assert_eq!(grid_step(&config, 18.0), 0.01);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Overlap and area guards
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_no_published_box_never_skips() {
        let config = FetchConfig::default();
        assert!(!should_skip_overlap(&config, &bbox(0.0, 0.0, 1.0, 1.0), None));
    }

    #[test]
    fn test_mostly_overlapping_comparable_box_skips() {
        let config = FetchConfig::default();
        let published = bbox(0.0, 0.0, 1.0, 1.0);
        let candidate = bbox(0.05, 0.05, 1.05, 1.0);
        assert!(should_skip_overlap(&config, &candidate, Some(&published)));
    }

    #[test]
    fn test_panned_away_box_fetches() {
        let config = FetchConfig::default();
        let published = bbox(0.0, 0.0, 1.0, 1.0);
        let candidate = bbox(0.0, 0.5, 1.0, 1.5);
        assert!(!should_skip_overlap(&config, &candidate, Some(&published)));
    }

    #[test]
    fn test_zoomed_out_box_fetches_even_when_covering() {
        let config = FetchConfig::default();
        let published = bbox(0.0, 0.0, 1.0, 1.0);
        // Fully contains the published box, but four times the area
        let candidate = bbox(-0.5, -0.5, 1.5, 1.5);
        assert!(!should_skip_overlap(&config, &candidate, Some(&published)));
    }

    #[test]
    fn test_zoomed_in_box_skips() {
        let config = FetchConfig::default();
        let published = bbox(0.0, 0.0, 1.0, 1.0);
        let candidate = bbox(0.25, 0.25, 0.75, 0.75);
        assert!(should_skip_overlap(&config, &candidate, Some(&published)));
    }

    #[test]
    fn test_area_ceiling() {
        let config = FetchConfig::default().with_max_area(0.25);
        assert!(!exceeds_area_ceiling(&config, &bbox(0.0, 0.0, 0.5, 0.5)));
        assert!(exceeds_area_ceiling(&config, &bbox(0.0, 0.0, 0.6, 0.5)));
    }
}
