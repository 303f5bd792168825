//! Shared application state.
//!
//! One [`AppState`] is shared (via `Arc`) between the fetch controller, the
//! location handler and the render loop. Each field has a single writer:
//!
//! | Field          | Writer              | Readers              |
//! |----------------|---------------------|----------------------|
//! | points         | fetch controller    | render loop, CLI     |
//! | user position  | location handler    | render loop          |
//! | heading        | orientation source  | render loop          |
//!
//! The current points of interest are published as a whole *generation*:
//! readers clone an `Arc<PoiSet>` snapshot and never observe a partially
//! updated set.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::geo::{BoundingBox, GeoPoint};
use crate::heading::HeadingTracker;
use crate::poi::{PoiList, PointOfInterest};

/// One published set of points of interest.
#[derive(Debug, Clone, Default)]
pub struct PoiSet {
    /// Monotonic publish counter, 0 for the initial empty set.
    pub generation: u64,
    /// The points, shared with the cache entry they came from.
    pub points: PoiList,
    /// Area the set was fetched for, if any.
    pub bounds: Option<BoundingBox>,
}

impl PoiSet {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointOfInterest> {
        self.points.iter()
    }
}

/// Process-wide state shared by the core components.
#[derive(Debug)]
pub struct AppState {
    points: RwLock<Arc<PoiSet>>,
    user_position: RwLock<Option<GeoPoint>>,
    heading: HeadingTracker,
    generation_tx: watch::Sender<u64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Empty state: no points, no position, heading 0.
    pub fn new() -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            points: RwLock::new(Arc::new(PoiSet::default())),
            user_position: RwLock::new(None),
            heading: HeadingTracker::new(),
            generation_tx,
        }
    }

    /// Replace the current set with `points` and return the new generation.
    pub fn publish(&self, points: PoiList, bounds: Option<BoundingBox>) -> u64 {
        let generation = {
            let mut current = self.points.write();
            let generation = current.generation + 1;
            *current = Arc::new(PoiSet {
                generation,
                points,
                bounds,
            });
            generation
        };

        self.generation_tx.send_replace(generation);
        tracing::debug!(generation, "Published points of interest");
        generation
    }

    /// Snapshot of the current set.
    pub fn current_points(&self) -> Arc<PoiSet> {
        Arc::clone(&self.points.read())
    }

    /// Generation of the current set.
    pub fn generation(&self) -> u64 {
        self.points.read().generation
    }

    /// Bounds of the current set, if it came from an area query.
    pub fn published_bounds(&self) -> Option<BoundingBox> {
        self.points.read().bounds
    }

    /// Watch for new generations.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }

    pub fn set_user_position(&self, position: GeoPoint) {
        *self.user_position.write() = Some(position);
    }

    pub fn user_position(&self) -> Option<GeoPoint> {
        *self.user_position.read()
    }

    pub fn heading(&self) -> &HeadingTracker {
        &self.heading
    }
}
