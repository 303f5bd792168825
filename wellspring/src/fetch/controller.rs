//! Viewport fetch controller.
//!
//! Turns a stream of viewport/location events into at most one outstanding
//! spatial query at a time.
//!
//! # Flow
//!
//! ```text
//! ViewportChanged ──► debounce ──► overlap? ──────► skip (keep published)
//!                                     │
//!                                     ▼
//!                                 quantize ──► cache? ──────► publish
//!                                     │
//!                                     ▼
//!                                same cell? ──────► keep in-flight query
//!                                     │
//!                                     ▼
//! Located ─────────────────────────► area? ──────► skip
//!                                     │
//!                                     ▼
//!                                   query ──► cache (boxes only) + publish
//! Refresh ──► clear cache ──► quantize ──► ... (no overlap or same-cell skip)
//! ```
//!
//! The decision logic is synchronous ([`ViewportFetchController::on_viewport_change`],
//! [`on_timer_fired`](ViewportFetchController::on_timer_fired),
//! [`complete`](ViewportFetchController::complete), ...). [`run`](ViewportFetchController::run)
//! drives it from an event channel, a debounce deadline and a completion
//! channel fed by spawned query tasks. Only the controller task writes the
//! cache and the published set.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::FetchConfig;
use super::policy::{debounce_delay, exceeds_area_ceiling, grid_step, should_skip_overlap};
use super::state::{FetchOutcome, FetchPhase, FetchStats, SkipReason};
use crate::cache::{CacheKey, SpatialCache};
use crate::geo::{BoundingBox, GeoPoint};
use crate::notify::{Notification, Notifier};
use crate::poi::PointOfInterest;
use crate::query::{QueryError, QueryRequest, SpatialQuery};
use crate::state::AppState;

/// Capacity of the viewport event channel created by [`ViewportFetchController::spawn`].
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The visible map area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bounds: BoundingBox,
    /// Map zoom level (fractional zoom allowed).
    pub zoom: f64,
}

impl Viewport {
    pub fn new(bounds: BoundingBox, zoom: f64) -> Self {
        Self { bounds, zoom }
    }
}

/// Input to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    /// The map was panned or zoomed.
    ViewportChanged(Viewport),
    /// The user's position was found.
    Located(GeoPoint),
    /// Drop cached results and fetch the latest viewport again.
    Refresh,
}

/// A query the controller wants issued.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    /// Identifies the fetch when it completes.
    pub id: u64,
    pub request: QueryRequest,
    /// Cancelled when a newer fetch supersedes this one.
    pub token: CancellationToken,
}

/// What a decision step resolved to.
#[derive(Debug, Clone)]
pub enum FetchDecision {
    /// Nothing to do.
    Skip(SkipReason),
    /// A cached result was published.
    CacheHit { count: usize },
    /// Issue this query and report back through [`ViewportFetchController::complete`].
    Fetch(FetchTicket),
}

struct InFlight {
    id: u64,
    token: CancellationToken,
    cache_key: Option<CacheKey>,
    bounds: BoundingBox,
}

type Completion = (u64, Result<Vec<PointOfInterest>, QueryError>);

/// Debounced, cancelling, cache-backed viewport fetcher.
pub struct ViewportFetchController {
    config: FetchConfig,
    cache: Arc<SpatialCache>,
    state: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    latest: Option<Viewport>,
    deadline: Option<Instant>,
    in_flight: Option<InFlight>,
    next_id: u64,
    last_outcome: Option<FetchOutcome>,
    stats: FetchStats,
}

impl std::fmt::Debug for ViewportFetchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportFetchController")
            .field("phase", &self.phase())
            .field("latest", &self.latest)
            .field("in_flight", &self.in_flight.as_ref().map(|f| f.id))
            .field("last_outcome", &self.last_outcome)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ViewportFetchController {
    /// Create a controller publishing into `state`.
    pub fn new(
        config: FetchConfig,
        cache: Arc<SpatialCache>,
        state: Arc<AppState>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            cache,
            state,
            notifier,
            latest: None,
            deadline: None,
            in_flight: None,
            next_id: 1,
            last_outcome: None,
            stats: FetchStats::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Current phase. A pending debounce reports `Scheduled` even while an
    /// older query is still outstanding.
    pub fn phase(&self) -> FetchPhase {
        if self.deadline.is_some() {
            FetchPhase::Scheduled
        } else if self.in_flight.is_some() {
            FetchPhase::InFlight
        } else {
            FetchPhase::Idle
        }
    }

    /// Whether a query is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// When the debounce timer fires, if one is running.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn last_outcome(&self) -> Option<&FetchOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn latest_viewport(&self) -> Option<&Viewport> {
        self.latest.as_ref()
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a viewport change and (re)arm the debounce timer.
    ///
    /// Returns the new deadline, or `None` when the zoom is below the fetch
    /// threshold (any pending schedule is dropped; an outstanding query is
    /// left alone).
    pub fn on_viewport_change(&mut self, viewport: Viewport, now: Instant) -> Option<Instant> {
        self.latest = Some(viewport);

        // NaN zoom fails this comparison too
        if !(viewport.zoom >= self.config.min_fetch_zoom) {
            if self.deadline.take().is_some() {
                debug!(zoom = viewport.zoom, "Zoomed out, pending fetch dropped");
            }
            self.record_skip(SkipReason::BelowMinZoom);
            return None;
        }

        let delay = debounce_delay(&self.config, viewport.zoom);
        let deadline = now + delay;
        self.deadline = Some(deadline);
        debug!(
            zoom = viewport.zoom,
            delay_ms = delay.as_millis() as u64,
            "Fetch scheduled"
        );
        Some(deadline)
    }

    /// The debounce timer elapsed: decide for the latest viewport.
    pub fn on_timer_fired(&mut self) -> FetchDecision {
        self.deadline = None;
        match self.latest {
            Some(viewport) => self.decide_viewport(viewport, false),
            None => self.skip(SkipReason::NoViewport),
        }
    }

    /// The user was located: fetch around them immediately.
    pub fn on_located(&mut self, position: GeoPoint) -> FetchDecision {
        let radius_m = self.config.location_radius_m;
        info!(position = %position, radius_m, "Fetching around located user");
        self.start_fetch(
            QueryRequest::Around {
                center: position,
                radius_m,
            },
            None,
        )
    }

    /// Clear the cache and fetch the latest viewport, ignoring overlap.
    ///
    /// Without a viewport, falls back to the user's position if known.
    pub fn on_refresh(&mut self) -> FetchDecision {
        self.cache.clear();
        self.deadline = None;

        match self.latest {
            Some(viewport) if viewport.zoom >= self.config.min_fetch_zoom => {
                self.decide_viewport(viewport, true)
            }
            Some(_) => self.skip(SkipReason::BelowMinZoom),
            None => match self.state.user_position() {
                Some(position) => self.on_located(position),
                None => self.skip(SkipReason::NoViewport),
            },
        }
    }

    /// Apply one event. Viewport changes only arm the timer and yield `None`.
    pub fn handle_event(&mut self, event: ViewportEvent, now: Instant) -> Option<FetchDecision> {
        match event {
            ViewportEvent::ViewportChanged(viewport) => {
                self.on_viewport_change(viewport, now);
                None
            }
            ViewportEvent::Located(position) => Some(self.on_located(position)),
            ViewportEvent::Refresh => Some(self.on_refresh()),
        }
    }

    /// Record the result of a fetch started by a [`FetchTicket`].
    ///
    /// Returns `None` when the ticket was superseded; its result is dropped
    /// without touching the cache or the published set.
    pub fn complete(
        &mut self,
        id: u64,
        result: Result<Vec<PointOfInterest>, QueryError>,
    ) -> Option<FetchOutcome> {
        let in_flight = match self.in_flight.take() {
            Some(current) if current.id == id && !current.token.is_cancelled() => current,
            other => {
                self.in_flight = other;
                debug!(id, "Dropped superseded fetch result");
                return None;
            }
        };

        let outcome = match result {
            Ok(points) => {
                let count = points.len();
                let points = Arc::new(points);
                if let Some(key) = in_flight.cache_key {
                    self.cache.put(key, Arc::clone(&points));
                }
                let generation = self.state.publish(points, Some(in_flight.bounds));
                self.stats.completed += 1;
                info!(id, count, generation, "Fetch completed");
                FetchOutcome::Completed { count }
            }
            Err(e) if e.is_cancelled() => {
                self.stats.cancelled += 1;
                debug!(id, "Fetch cancelled");
                FetchOutcome::Cancelled
            }
            Err(e) => {
                self.stats.failed += 1;
                warn!(id, error = %e, "Fetch failed, keeping previous results");
                self.notifier.notify(Notification::warning(format!(
                    "Could not load drinking water sources: {}",
                    e
                )));
                FetchOutcome::Failed {
                    status: e.status(),
                    message: e.to_string(),
                }
            }
        };

        self.last_outcome = Some(outcome.clone());
        Some(outcome)
    }

    /// Cancel the outstanding query, if any.
    pub fn cancel_in_flight(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            previous.token.cancel();
            self.stats.cancelled += 1;
            debug!(id = previous.id, "Cancelled superseded fetch");
        }
    }

    fn decide_viewport(&mut self, viewport: Viewport, force: bool) -> FetchDecision {
        if !force {
            let published = self.state.published_bounds();
            if should_skip_overlap(&self.config, &viewport.bounds, published.as_ref()) {
                // The published set already serves the latest intent
                self.cancel_in_flight();
                return self.skip(SkipReason::Overlapping);
            }
        }

        let step = grid_step(&self.config, viewport.zoom);
        let (key, quantized) = CacheKey::quantize(&viewport.bounds, step);

        if let Some(entry) = self.cache.get(&key) {
            self.cancel_in_flight();
            let count = entry.points.len();
            self.state.publish(entry.points, Some(quantized));
            self.stats.cache_hits += 1;
            self.last_outcome = Some(FetchOutcome::CacheHit { count });
            debug!(key = %key, count, "Served viewport from cache");
            return FetchDecision::CacheHit { count };
        }

        if !force && self.in_flight.as_ref().and_then(|f| f.cache_key) == Some(key) {
            debug!(key = %key, "Same cell already in flight");
            return self.skip(SkipReason::AlreadyInFlight);
        }

        self.start_fetch(QueryRequest::Bounds(quantized), Some(key))
    }

    fn start_fetch(&mut self, request: QueryRequest, cache_key: Option<CacheKey>) -> FetchDecision {
        let bounds = request.bounds();
        if exceeds_area_ceiling(&self.config, &bounds) {
            debug!(
                area = bounds.area_sq_deg(),
                max = self.config.max_area_sq_deg,
                "Query area too large"
            );
            return self.skip(SkipReason::AreaTooLarge);
        }

        self.cancel_in_flight();

        let id = self.next_id;
        self.next_id += 1;
        let token = CancellationToken::new();

        self.in_flight = Some(InFlight {
            id,
            token: token.clone(),
            cache_key,
            bounds,
        });
        self.stats.fetches_started += 1;
        debug!(id, bounds = %bounds, "Fetch started");

        FetchDecision::Fetch(FetchTicket { id, request, token })
    }

    fn skip(&mut self, reason: SkipReason) -> FetchDecision {
        self.record_skip(reason);
        FetchDecision::Skip(reason)
    }

    fn record_skip(&mut self, reason: SkipReason) {
        self.stats.skipped += 1;
        self.last_outcome = Some(FetchOutcome::Skipped(reason));
        debug!(reason = %reason, "Fetch skipped");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event loop
    // ─────────────────────────────────────────────────────────────────────────

    /// Spawn the controller on the current runtime.
    ///
    /// Returns the event sender and the task handle. The task ends when every
    /// sender is dropped or `shutdown` is cancelled.
    pub fn spawn(
        self,
        query: Arc<dyn SpatialQuery>,
        shutdown: CancellationToken,
    ) -> (mpsc::Sender<ViewportEvent>, JoinHandle<FetchStats>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = tokio::spawn(self.run(query, rx, shutdown));
        (tx, handle)
    }

    /// Drive the controller until the event channel closes or `shutdown`
    /// fires. Any outstanding query is cancelled on exit.
    pub async fn run(
        mut self,
        query: Arc<dyn SpatialQuery>,
        mut events: mpsc::Receiver<ViewportEvent>,
        shutdown: CancellationToken,
    ) -> FetchStats {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        info!(source = query.name(), "Viewport fetch controller started");

        loop {
            let deadline = self.deadline;

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Viewport fetch controller shutting down");
                    break;
                }

                Some((id, result)) = done_rx.recv() => {
                    self.complete(id, result);
                }

                event = events.recv() => {
                    let Some(event) = event else { break };
                    if let Some(decision) = self.handle_event(event, Instant::now()) {
                        Self::dispatch(decision, &query, &done_tx);
                    }
                }

                _ = wait_until(deadline) => {
                    let decision = self.on_timer_fired();
                    Self::dispatch(decision, &query, &done_tx);
                }
            }
        }

        self.cancel_in_flight();
        info!(
            started = self.stats.fetches_started,
            completed = self.stats.completed,
            cache_hits = self.stats.cache_hits,
            failed = self.stats.failed,
            "Viewport fetch controller stopped"
        );
        self.stats
    }

    fn dispatch(
        decision: FetchDecision,
        query: &Arc<dyn SpatialQuery>,
        done_tx: &mpsc::UnboundedSender<Completion>,
    ) {
        let FetchDecision::Fetch(ticket) = decision else {
            return;
        };

        let query = Arc::clone(query);
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let result = query.query(ticket.request, ticket.token).await;
            // Controller gone means nobody cares about the result
            let _ = done_tx.send((ticket.id, result));
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
