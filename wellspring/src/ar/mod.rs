//! Augmented-reality overlay.
//!
//! - [`projector`]: pure per-frame projection of points onto the screen
//! - [`render`]: gated fixed-cadence render loop feeding a drawing surface
//! - [`session`]: camera/orientation acquisition for AR mode

pub mod projector;
pub mod render;
pub mod session;

use std::time::Duration;

pub use projector::{
    format_distance, project, ArFrame, ProjectedMarker, ProjectionStatus, ProjectorConfig,
    ScreenSize,
};
pub use render::{DrawingSurface, RenderGate, RenderLoop, DEFAULT_FRAME_INTERVAL};
pub use session::{ArError, ArSession, CameraFeed, Device, OrientationSource};

/// Projection plus render cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArConfig {
    pub projector: ProjectorConfig,
    pub frame_interval: Duration,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            projector: ProjectorConfig::default(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }
}
