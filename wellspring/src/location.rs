//! Reaction to geolocation results.
//!
//! Acquiring a position is up to the platform; this module only handles the
//! outcome. A found position becomes the user position in [`AppState`] and
//! triggers an immediate fetch around it. A failure is reported to the user
//! and leaves any earlier position in place.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::fetch::ViewportEvent;
use crate::geo::GeoPoint;
use crate::notify::{Notification, Notifier};
use crate::state::AppState;

/// Why no position could be determined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),

    #[error("Location request timed out")]
    Timeout,
}

/// Outcome of a geolocation request.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Found(GeoPoint),
    Error(LocationError),
}

/// Applies geolocation results to shared state and the fetch controller.
pub struct LocationHandler {
    state: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    fetch_events: mpsc::Sender<ViewportEvent>,
}

impl LocationHandler {
    pub fn new(
        state: Arc<AppState>,
        notifier: Arc<dyn Notifier>,
        fetch_events: mpsc::Sender<ViewportEvent>,
    ) -> Self {
        Self {
            state,
            notifier,
            fetch_events,
        }
    }

    /// Apply one geolocation result.
    pub async fn handle(&self, event: LocationEvent) {
        match event {
            LocationEvent::Found(position) => {
                info!(position = %position, "User located");
                self.state.set_user_position(position);
                if self
                    .fetch_events
                    .send(ViewportEvent::Located(position))
                    .await
                    .is_err()
                {
                    warn!("Fetch controller gone, location fetch not requested");
                }
            }
            LocationEvent::Error(error) => {
                warn!(error = %error, "Geolocation failed");
                self.notifier.notify(Notification::warning(error.to_string()));
            }
        }
    }
}
