//! Per-frame AR render loop.
//!
//! While the gate is open (AR mode on and the surface visible) the loop ticks
//! at a fixed cadence. Each tick reads the latest heading, user position, and
//! published points, projects them, and hands the frame to the
//! [`DrawingSurface`]. While the gate is closed the loop awaits the next gate
//! change and does no other work. Reopening restarts the cadence from scratch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::projector::{project, ArFrame, ProjectorConfig};
use crate::state::AppState;

/// Default frame cadence (~30 fps).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Receives projected frames. Must not block.
pub trait DrawingSurface: Send {
    /// Draw one frame, replacing whatever was drawn before.
    fn draw(&mut self, frame: &ArFrame<'_>);

    /// Remove the overlay (AR mode left or surface hidden).
    fn clear(&mut self) {}
}

/// Conditions under which frames are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderGate {
    pub ar_active: bool,
    pub visible: bool,
}

impl RenderGate {
    pub fn open() -> Self {
        Self {
            ar_active: true,
            visible: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ar_active && self.visible
    }
}

/// Render loop bound to one drawing surface.
pub struct RenderLoop<S: DrawingSurface> {
    state: Arc<AppState>,
    config: ProjectorConfig,
    frame_interval: Duration,
    surface: S,
    frames_drawn: u64,
}

impl<S: DrawingSurface> RenderLoop<S> {
    pub fn new(state: Arc<AppState>, config: ProjectorConfig, surface: S) -> Self {
        Self {
            state,
            config,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            surface,
            frames_drawn: 0,
        }
    }

    /// Set the frame cadence. Zero is raised to one millisecond.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Project and draw one frame from the current shared state.
    pub fn render_frame(&mut self) {
        let heading = self.state.heading().current_heading();

        match self.state.user_position() {
            Some(user) => {
                let current = self.state.current_points();
                let frame = project(&self.config, heading, &user, &current.points);
                self.surface.draw(&frame);
            }
            None => self.surface.draw(&ArFrame::awaiting_location(heading)),
        }

        self.frames_drawn += 1;
    }

    /// Run until `shutdown` fires or the gate sender is dropped.
    ///
    /// Returns the surface so callers can inspect or reuse it.
    pub async fn run(
        mut self,
        mut gate: watch::Receiver<RenderGate>,
        shutdown: CancellationToken,
    ) -> S {
        info!(
            frame_interval_ms = self.frame_interval.as_millis() as u64,
            "AR render loop started"
        );

        'outer: loop {
            // Parked: no ticking until the gate opens
            loop {
                let open = gate.borrow_and_update().is_open();
                if open {
                    break;
                }
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => break 'outer,
                    changed = gate.changed() => {
                        if changed.is_err() {
                            break 'outer;
                        }
                    }
                }
            }

            debug!("AR render loop resumed");
            let mut ticker = tokio::time::interval(self.frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => break 'outer,

                    changed = gate.changed() => {
                        if changed.is_err() {
                            break 'outer;
                        }
                        let open = gate.borrow_and_update().is_open();
                        if !open {
                            self.surface.clear();
                            debug!(frames = self.frames_drawn, "AR render loop parked");
                            break;
                        }
                    }

                    _ = ticker.tick() => self.render_frame(),
                }
            }
        }

        self.surface.clear();
        info!(frames = self.frames_drawn, "AR render loop stopped");
        self.surface
    }
}
