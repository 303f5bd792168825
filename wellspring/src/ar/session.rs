//! AR mode lifecycle.
//!
//! Entering AR mode acquires two device resources in order: the camera feed,
//! then the orientation sensor subscription. If either step fails, everything
//! acquired so far is released, the user is told why, and the session stays
//! inactive. Leaving AR mode releases both and closes the render gate.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::render::RenderGate;
use crate::heading::OrientationEvent;
use crate::notify::{Notification, Notifier};
use crate::state::AppState;

/// Device whose permission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Camera,
    Orientation,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Camera => write!(f, "Camera"),
            Device::Orientation => write!(f, "Orientation sensor"),
        }
    }
}

/// Why AR mode could not be entered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArError {
    #[error("{device} access denied")]
    PermissionDenied { device: Device },

    #[error("This device has no usable {device}")]
    SensorUnsupported { device: Device },
}

/// Live camera stream behind the overlay.
pub trait CameraFeed: Send {
    /// Acquire the camera.
    fn start(&mut self) -> BoxFuture<'_, Result<(), ArError>>;

    /// Release the camera. Must be safe to call when not started.
    fn stop(&mut self);
}

/// Device orientation events.
pub trait OrientationSource: Send {
    /// Begin delivering events.
    fn subscribe(&mut self) -> BoxFuture<'_, Result<mpsc::Receiver<OrientationEvent>, ArError>>;

    /// Stop delivering events. Must be safe to call when not subscribed.
    fn unsubscribe(&mut self);
}

struct Listener {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the device resources for AR mode and drives the render gate.
pub struct ArSession {
    camera: Box<dyn CameraFeed>,
    orientation: Box<dyn OrientationSource>,
    state: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    gate: watch::Sender<RenderGate>,
    listener: Option<Listener>,
}

impl ArSession {
    pub fn new(
        camera: Box<dyn CameraFeed>,
        orientation: Box<dyn OrientationSource>,
        state: Arc<AppState>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (gate, _) = watch::channel(RenderGate {
            ar_active: false,
            visible: true,
        });

        Self {
            camera,
            orientation,
            state,
            notifier,
            gate,
            listener: None,
        }
    }

    /// Receiver to hand to a [`RenderLoop`](super::render::RenderLoop).
    pub fn gate(&self) -> watch::Receiver<RenderGate> {
        self.gate.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    /// Acquire camera and orientation, then open the render gate.
    ///
    /// Calling this while already active is a no-op.
    pub async fn enter(&mut self) -> Result<(), ArError> {
        if self.is_active() {
            return Ok(());
        }

        if let Err(e) = self.camera.start().await {
            self.camera.stop();
            return Err(self.report(e));
        }

        let events = match self.orientation.subscribe().await {
            Ok(events) => events,
            Err(e) => {
                self.orientation.unsubscribe();
                self.camera.stop();
                return Err(self.report(e));
            }
        };

        self.listener = Some(spawn_listener(Arc::clone(&self.state), events));
        self.gate.send_modify(|gate| gate.ar_active = true);
        info!("Entered AR mode");
        Ok(())
    }

    /// Release device resources and close the render gate.
    pub fn exit(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };

        listener.token.cancel();
        self.orientation.unsubscribe();
        self.camera.stop();
        self.gate.send_modify(|gate| gate.ar_active = false);
        info!("Left AR mode");

        // The listener exits on its own once cancelled
        drop(listener.task);
    }

    /// Host surface shown or hidden. Hidden parks the render loop.
    pub fn set_visible(&self, visible: bool) {
        self.gate.send_if_modified(|gate| {
            let changed = gate.visible != visible;
            gate.visible = visible;
            changed
        });
        debug!(visible, "AR surface visibility changed");
    }

    fn report(&self, error: ArError) -> ArError {
        warn!(error = %error, "Could not enter AR mode");
        self.notifier
            .notify(Notification::error(format!("AR unavailable: {}", error)));
        error
    }
}

impl Drop for ArSession {
    fn drop(&mut self) {
        self.exit();
    }
}

fn spawn_listener(state: Arc<AppState>, mut events: mpsc::Receiver<OrientationEvent>) -> Listener {
    let token = CancellationToken::new();
    let child = token.clone();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = child.cancelled() => break,

                event = events.recv() => {
                    let Some(event) = event else { break };
                    state.heading().ingest(&event);
                }
            }
        }
        debug!("Orientation listener stopped");
    });

    Listener { token, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChannelNotifier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        camera_started: AtomicUsize,
        camera_stopped: AtomicUsize,
        unsubscribed: AtomicUsize,
        sender: parking_lot::Mutex<Option<mpsc::Sender<OrientationEvent>>>,
    }

    struct FakeCamera {
        result: Result<(), ArError>,
        counters: Arc<Counters>,
    }

    impl CameraFeed for FakeCamera {
        fn start(&mut self) -> BoxFuture<'_, Result<(), ArError>> {
            self.counters.camera_started.fetch_add(1, Ordering::SeqCst);
            let result = self.result.clone();
            Box::pin(async move { result })
        }

        fn stop(&mut self) {
            self.counters.camera_stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeOrientation {
        fail_with: Option<ArError>,
        counters: Arc<Counters>,
    }

    impl OrientationSource for FakeOrientation {
        fn subscribe(
            &mut self,
        ) -> BoxFuture<'_, Result<mpsc::Receiver<OrientationEvent>, ArError>> {
            Box::pin(async move {
                if let Some(e) = self.fail_with.clone() {
                    return Err(e);
                }
                let (tx, rx) = mpsc::channel(8);
                *self.counters.sender.lock() = Some(tx);
                Ok(rx)
            })
        }

        fn unsubscribe(&mut self) {
            self.counters.sender.lock().take();
            self.counters.unsubscribed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn session(
        camera: Result<(), ArError>,
        orientation: Option<ArError>,
    ) -> (ArSession, Arc<Counters>, mpsc::Receiver<Notification>) {
        let counters = Arc::new(Counters::default());
        let (notifier, rx) = ChannelNotifier::channel(4);
        let session = ArSession::new(
            Box::new(FakeCamera {
                result: camera,
                counters: Arc::clone(&counters),
            }),
            Box::new(FakeOrientation {
                fail_with: orientation,
                counters: Arc::clone(&counters),
            }),
            Arc::new(AppState::new()),
            Arc::new(notifier),
        );
        (session, counters, rx)
    }

    #[tokio::test]
    async fn test_enter_opens_gate() {
        let (mut session, counters, _rx) = session(Ok(()), None);
        let gate = session.gate();

        session.enter().await.unwrap();
        assert!(session.is_active());
        assert!(gate.borrow().is_open());
        assert_eq!(counters.camera_started.load(Ordering::SeqCst), 1);

        // Second enter is a no-op
        session.enter().await.unwrap();
        assert_eq!(counters.camera_started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_camera_denied_aborts_entry() {
        let denied = ArError::PermissionDenied {
            device: Device::Camera,
        };
        let (mut session, counters, mut rx) = session(Err(denied.clone()), None);
        let gate = session.gate();

        let err = session.enter().await.unwrap_err();
        assert_eq!(err, denied);
        assert!(!session.is_active());
        assert!(!gate.borrow().is_open());
        assert_eq!(counters.camera_stopped.load(Ordering::SeqCst), 1);

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.message, "AR unavailable: Camera access denied");
    }

    #[tokio::test]
    async fn test_unsupported_sensor_releases_camera() {
        let unsupported = ArError::SensorUnsupported {
            device: Device::Orientation,
        };
        let (mut session, counters, mut rx) = session(Ok(()), Some(unsupported.clone()));

        let err = session.enter().await.unwrap_err();
        assert_eq!(err, unsupported);
        assert!(!session.is_active());
        assert_eq!(counters.camera_started.load(Ordering::SeqCst), 1);
        assert_eq!(counters.camera_stopped.load(Ordering::SeqCst), 1);
        assert_eq!(counters.unsubscribed.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_exit_releases_everything() {
        let (mut session, counters, _rx) = session(Ok(()), None);
        let gate = session.gate();
        session.enter().await.unwrap();

        session.exit();
        assert!(!session.is_active());
        assert!(!gate.borrow().is_open());
        assert_eq!(counters.camera_stopped.load(Ordering::SeqCst), 1);
        assert_eq!(counters.unsubscribed.load(Ordering::SeqCst), 1);

        // Exit when inactive does nothing
        session.exit();
        assert_eq!(counters.camera_stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_visibility_toggles_gate() {
        let (mut session, _counters, _rx) = session(Ok(()), None);
        let gate = session.gate();
        session.enter().await.unwrap();

        session.set_visible(false);
        assert!(!gate.borrow().is_open());
        session.set_visible(true);
        assert!(gate.borrow().is_open());
    }

    #[tokio::test]
    async fn test_orientation_events_update_heading() {
        let counters = Arc::new(Counters::default());
        let state = Arc::new(AppState::new());
        let mut session = ArSession::new(
            Box::new(FakeCamera {
                result: Ok(()),
                counters: Arc::clone(&counters),
            }),
            Box::new(FakeOrientation {
                fail_with: None,
                counters: Arc::clone(&counters),
            }),
            Arc::clone(&state),
            Arc::new(crate::notify::LogNotifier),
        );
        session.enter().await.unwrap();

        let sender = counters.sender.lock().clone().unwrap();
        sender
            .send(OrientationEvent::with_compass(135.0))
            .await
            .unwrap();

        for _ in 0..100 {
            if state.heading().latest_sample().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(state.heading().current_heading(), 135.0);
    }
}
