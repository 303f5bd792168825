//! Device heading from orientation sensor events.
//!
//! Platforms report orientation in different conventions. This module
//! resolves each event to a single compass heading using a fixed precedence:
//!
//! 1. an **absolute** reading (`absolute == true` with an `alpha` angle),
//! 2. a platform **compass heading** (flagged unreliable unless the event was
//!    absolute),
//! 3. a raw **relative** `alpha` as a last resort (always unreliable).
//!
//! `alpha` is measured counter-clockwise, so it converts to a compass heading
//! as `360 - alpha`. Compass headings are already clockwise from north.
//!
//! There is no smoothing: each resolved sample replaces the previous one, and
//! readers always see the latest value.

use std::fmt;

use parking_lot::RwLock;

use crate::geo::normalize_bearing;

/// Where a heading value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingSource {
    /// Earth-referenced absolute orientation.
    AbsoluteCompass,
    /// Platform-specific magnetometer compass heading.
    MagneticCompass,
    /// Orientation relative to an arbitrary start frame.
    RelativeUnreliable,
}

impl HeadingSource {
    /// Short description for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadingSource::AbsoluteCompass => "absolute",
            HeadingSource::MagneticCompass => "compass",
            HeadingSource::RelativeUnreliable => "relative",
        }
    }
}

impl fmt::Display for HeadingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One raw orientation event as delivered by the sensor collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationEvent {
    /// Rotation around the z axis in degrees, counter-clockwise.
    pub alpha: Option<f64>,
    /// Whether `alpha` is referenced to the Earth frame.
    pub absolute: bool,
    /// Platform compass heading in degrees, clockwise from north.
    pub compass_heading: Option<f64>,
}

impl OrientationEvent {
    /// An Earth-referenced event.
    pub fn absolute(alpha: f64) -> Self {
        Self {
            alpha: Some(alpha),
            absolute: true,
            compass_heading: None,
        }
    }

    /// A relative event carrying only `alpha`.
    pub fn relative(alpha: f64) -> Self {
        Self {
            alpha: Some(alpha),
            absolute: false,
            compass_heading: None,
        }
    }

    /// A relative event that also carries a platform compass heading.
    pub fn with_compass(compass_heading: f64) -> Self {
        Self {
            alpha: None,
            absolute: false,
            compass_heading: Some(compass_heading),
        }
    }
}

/// A resolved heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingSample {
    /// Compass heading in [0, 360).
    pub degrees: f64,
    pub source: HeadingSource,
    /// False when the value may drift from true north.
    pub reliable: bool,
}

impl HeadingSample {
    /// Resolve an orientation event, or `None` if it carries no usable angle.
    pub fn resolve(event: &OrientationEvent) -> Option<Self> {
        let usable = |v: &f64| v.is_finite();

        if event.absolute {
            if let Some(alpha) = event.alpha.filter(usable) {
                return Some(Self {
                    degrees: normalize_bearing(360.0 - alpha),
                    source: HeadingSource::AbsoluteCompass,
                    reliable: true,
                });
            }
        }

        if let Some(heading) = event.compass_heading.filter(usable) {
            return Some(Self {
                degrees: normalize_bearing(heading),
                source: HeadingSource::MagneticCompass,
                reliable: event.absolute,
            });
        }

        event.alpha.filter(usable).map(|alpha| Self {
            degrees: normalize_bearing(360.0 - alpha),
            source: HeadingSource::RelativeUnreliable,
            reliable: false,
        })
    }
}

/// Latest-value heading store.
///
/// Written by the orientation listener, read by the render loop. A single
/// `RwLock` replacement is the only synchronization.
#[derive(Debug, Default)]
pub struct HeadingTracker {
    latest: RwLock<Option<HeadingSample>>,
}

impl HeadingTracker {
    /// Create a tracker with no sample yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve and store an event.
    ///
    /// Returns the stored sample, or `None` if the event was ignored (the
    /// previous value is kept).
    pub fn ingest(&self, event: &OrientationEvent) -> Option<HeadingSample> {
        let sample = HeadingSample::resolve(event)?;

        let previous = self.latest.write().replace(sample);
        let source_changed = previous.map(|p| p.source) != Some(sample.source);
        if source_changed {
            tracing::debug!(
                source = %sample.source,
                reliable = sample.reliable,
                "Heading source changed"
            );
        }

        Some(sample)
    }

    /// Latest heading in degrees, 0.0 before any sample.
    pub fn current_heading(&self) -> f64 {
        self.latest.read().map(|s| s.degrees).unwrap_or(0.0)
    }

    /// Latest full sample, if any.
    pub fn latest_sample(&self) -> Option<HeadingSample> {
        *self.latest.read()
    }

    /// Forget the current sample (e.g. when leaving AR mode).
    pub fn reset(&self) {
        *self.latest.write() = None;
    }
}
