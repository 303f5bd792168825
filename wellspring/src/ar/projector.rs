//! Heading-relative screen projection of points of interest.
//!
//! For every frame the projector answers: given where the user stands and
//! which way the device points, which markers are visible and where do they
//! go on screen?
//!
//! # Screen mapping
//!
//! ```text
//!   x:  relative angle  -fov/2 ......... 0 ......... +fov/2
//!                       left margin    center    right margin
//!
//!   y:  horizon line  ← far (max distance, min scale)
//!            │
//!       near line     ← close (distance 0, max scale)
//! ```
//!
//! Vertical position and scale share one closeness factor
//! `c = 1 - sqrt(distance / max_distance)`, so nearby points spread out more
//! than distant ones.

use std::fmt;

use crate::geo::{distance_meters, initial_bearing_degrees, normalize_angle, GeoPoint};
use crate::poi::PointOfInterest;

/// Default culling distance in metres.
pub const DEFAULT_MAX_DISTANCE_M: f64 = 1000.0;

/// Default horizontal field of view in degrees.
pub const DEFAULT_FOV_DEG: f64 = 75.0;

/// Default maximum number of markers drawn per frame.
pub const DEFAULT_MAX_RENDERED: usize = 8;

/// Default fraction of the half-width used at the FOV edge.
pub const DEFAULT_EDGE_MARGIN: f64 = 0.9;

/// Surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center_x(&self) -> f64 {
        self.width / 2.0
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::new(1080.0, 1920.0)
    }
}

/// Projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectorConfig {
    /// Points farther than this are dropped.
    pub max_distance_m: f64,
    /// Horizontal field of view, centred on the heading.
    pub horizontal_fov_deg: f64,
    /// At most this many markers are emitted.
    pub max_rendered: usize,
    /// Fraction of the half-width reached at ±fov/2.
    pub edge_margin: f64,
    pub screen: ScreenSize,
    /// Horizon line as a fraction of screen height (far points).
    pub horizon_fraction: f64,
    /// Near line as a fraction of screen height (close points).
    pub near_fraction: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            max_distance_m: DEFAULT_MAX_DISTANCE_M,
            horizontal_fov_deg: DEFAULT_FOV_DEG,
            max_rendered: DEFAULT_MAX_RENDERED,
            edge_margin: DEFAULT_EDGE_MARGIN,
            screen: ScreenSize::default(),
            horizon_fraction: 0.35,
            near_fraction: 0.85,
            min_scale: 0.5,
            max_scale: 1.5,
        }
    }
}

impl ProjectorConfig {
    pub fn with_screen(mut self, screen: ScreenSize) -> Self {
        self.screen = screen;
        self
    }

    pub fn with_max_distance(mut self, max_distance_m: f64) -> Self {
        self.max_distance_m = max_distance_m;
        self
    }

    pub fn with_fov(mut self, fov_deg: f64) -> Self {
        self.horizontal_fov_deg = fov_deg;
        self
    }

    pub fn with_max_rendered(mut self, max_rendered: usize) -> Self {
        self.max_rendered = max_rendered;
        self
    }

    fn half_fov(&self) -> f64 {
        self.horizontal_fov_deg.clamp(0.0, 360.0) / 2.0
    }

    fn horizon_y(&self) -> f64 {
        self.screen.height * self.horizon_fraction
    }

    fn near_y(&self) -> f64 {
        self.screen.height * self.near_fraction
    }
}

/// One point of interest placed on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedMarker<'a> {
    pub poi: &'a PointOfInterest,
    pub distance_m: f64,
    /// Signed angle from the heading, negative to the left.
    pub relative_angle_deg: f64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub scale: f64,
}

/// Summary line for a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionStatus {
    /// No user position yet.
    AwaitingLocation,
    /// Closest visible marker.
    Nearest { name: String, distance_m: f64 },
    /// Points exist but none are in view and range.
    OutOfView { count: usize },
    /// No points at all.
    NoneFound,
}

impl fmt::Display for ProjectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionStatus::AwaitingLocation => write!(f, "Waiting for location..."),
            ProjectionStatus::Nearest { name, distance_m } => {
                write!(f, "Nearest: {} ({})", name, format_distance(*distance_m))
            }
            ProjectionStatus::OutOfView { count: 1 } => {
                write!(f, "1 water source nearby, turn to find it")
            }
            ProjectionStatus::OutOfView { count } => {
                write!(f, "{} water sources nearby, turn to find them", count)
            }
            ProjectionStatus::NoneFound => write!(f, "No water sources found"),
        }
    }
}

/// Human-readable distance: metres below 1 km, kilometres above.
pub fn format_distance(distance_m: f64) -> String {
    if distance_m < 1000.0 {
        format!("{:.0} m", distance_m)
    } else {
        format!("{:.1} km", distance_m / 1000.0)
    }
}

/// Output of one projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ArFrame<'a> {
    /// Heading the frame was projected for.
    pub heading_deg: f64,
    /// Closest first.
    pub markers: Vec<ProjectedMarker<'a>>,
    pub status: ProjectionStatus,
}

impl ArFrame<'static> {
    /// A frame with nothing to draw.
    pub fn awaiting_location(heading_deg: f64) -> Self {
        ArFrame {
            heading_deg,
            markers: Vec::new(),
            status: ProjectionStatus::AwaitingLocation,
        }
    }
}

/// Project `points` for a user at `user` facing `heading_deg`.
pub fn project<'a>(
    config: &ProjectorConfig,
    heading_deg: f64,
    user: &GeoPoint,
    points: &'a [PointOfInterest],
) -> ArFrame<'a> {
    let half_fov = config.half_fov();

    let mut candidates: Vec<(&'a PointOfInterest, f64, f64)> = points
        .iter()
        .filter_map(|poi| {
            let distance = distance_meters(user, &poi.position);
            if distance > config.max_distance_m {
                return None;
            }

            let bearing = initial_bearing_degrees(user, &poi.position);
            let relative = normalize_angle(bearing - heading_deg);
            if !relative.is_finite() || relative.abs() > half_fov {
                return None;
            }

            Some((poi, distance, relative))
        })
        .collect();

    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    candidates.truncate(config.max_rendered);

    let markers: Vec<ProjectedMarker<'a>> = candidates
        .into_iter()
        .map(|(poi, distance, relative)| place(config, half_fov, poi, distance, relative))
        .collect();

    let status = match markers.first() {
        Some(nearest) => ProjectionStatus::Nearest {
            name: nearest.poi.display_name.clone(),
            distance_m: nearest.distance_m,
        },
        None if !points.is_empty() => ProjectionStatus::OutOfView {
            count: points.len(),
        },
        None => ProjectionStatus::NoneFound,
    };

    ArFrame {
        heading_deg,
        markers,
        status,
    }
}

fn place<'a>(
    config: &ProjectorConfig,
    half_fov: f64,
    poi: &'a PointOfInterest,
    distance_m: f64,
    relative_angle_deg: f64,
) -> ProjectedMarker<'a> {
    let screen = &config.screen;

    let offset = if half_fov > 0.0 {
        relative_angle_deg / half_fov
    } else {
        0.0
    };
    let screen_x = screen.center_x() + offset * (screen.width / 2.0) * config.edge_margin;

    let ratio = if config.max_distance_m > 0.0 {
        (distance_m / config.max_distance_m).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closeness = 1.0 - ratio.sqrt();

    let horizon_y = config.horizon_y();
    let screen_y = horizon_y + (config.near_y() - horizon_y) * closeness;
    let scale = config.min_scale + (config.max_scale - config.min_scale) * closeness;

    ProjectedMarker {
        poi,
        distance_m,
        relative_angle_deg,
        screen_x,
        screen_y,
        scale,
    }
}
