//! End-to-end tests for the viewport fetch controller task.
//!
//! The spatial source is a scripted mock that answers after a fixed delay and
//! honours cancellation. Time is paused so debounce windows are exact.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wellspring::cache::{CacheConfig, SpatialCache};
use wellspring::fetch::{FetchConfig, Viewport, ViewportEvent, ViewportFetchController};
use wellspring::geo::{BoundingBox, GeoPoint};
use wellspring::notify::{ChannelNotifier, Notification};
use wellspring::poi::PointOfInterest;
use wellspring::query::{QueryError, QueryRequest, SpatialQuery};
use wellspring::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Mock spatial source
// ─────────────────────────────────────────────────────────────────────────────

struct Call {
    request: QueryRequest,
    token: CancellationToken,
    finished: bool,
}

struct MockQuery {
    delay: Duration,
    fail_with: Mutex<Option<QueryError>>,
    calls: Mutex<Vec<Call>>,
    max_active: AtomicUsize,
}

impl MockQuery {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            fail_with: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            max_active: AtomicUsize::new(0),
        })
    }

    fn fail_next(&self, error: QueryError) {
        *self.fail_with.lock() = Some(error);
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn requests(&self) -> Vec<QueryRequest> {
        self.calls.lock().iter().map(|c| c.request).collect()
    }

    /// One point at the center of the requested area.
    fn answer(request: &QueryRequest) -> Vec<PointOfInterest> {
        let center = request.bounds().center();
        vec![PointOfInterest::new(
            format!("node/{:.3},{:.3}", center.latitude, center.longitude),
            center,
            "Fountain",
        )]
    }
}

impl SpatialQuery for MockQuery {
    fn query(
        &self,
        request: QueryRequest,
        cancellation: CancellationToken,
    ) -> BoxFuture<'_, Result<Vec<PointOfInterest>, QueryError>> {
        Box::pin(async move {
            let index = {
                let mut calls = self.calls.lock();
                let active = calls
                    .iter()
                    .filter(|c| !c.finished && !c.token.is_cancelled())
                    .count();
                self.max_active.fetch_max(active + 1, Ordering::SeqCst);
                calls.push(Call {
                    request,
                    token: cancellation.clone(),
                    finished: false,
                });
                calls.len() - 1
            };

            let result = tokio::select! {
                biased;

                _ = cancellation.cancelled() => Err(QueryError::Cancelled),
                _ = tokio::time::sleep(self.delay) => match self.fail_with.lock().take() {
                    Some(e) => Err(e),
                    None => Ok(Self::answer(&request)),
                },
            };

            self.calls.lock()[index].finished = true;
            result
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

struct Harness {
    events: mpsc::Sender<ViewportEvent>,
    state: Arc<AppState>,
    cache: Arc<SpatialCache>,
    notifications: mpsc::Receiver<Notification>,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<wellspring::fetch::FetchStats>,
}

fn start(query: Arc<MockQuery>) -> Harness {
    let state = Arc::new(AppState::new());
    let cache = Arc::new(SpatialCache::new(CacheConfig::default()));
    let (notifier, notifications) = ChannelNotifier::channel(8);
    let shutdown = CancellationToken::new();

    let controller = ViewportFetchController::new(
        FetchConfig::default(),
        Arc::clone(&cache),
        Arc::clone(&state),
        Arc::new(notifier),
    );
    let (events, task) = controller.spawn(query, shutdown.clone());

    Harness {
        events,
        state,
        cache,
        notifications,
        shutdown,
        task,
    }
}

fn view(south: f64, west: f64) -> ViewportEvent {
    let bounds = BoundingBox::new(south, west, south + 0.01, west + 0.02).unwrap();
    ViewportEvent::ViewportChanged(Viewport::new(bounds, 16.0))
}

fn hamburg() -> ViewportEvent {
    view(53.550, 9.980)
}

fn munich() -> ViewportEvent {
    view(48.130, 11.570)
}

async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_events_inside_debounce_window_produce_one_fetch_for_latest_box() {
    let query = MockQuery::new(Duration::from_millis(50));
    let h = start(Arc::clone(&query));

    h.events.send(hamburg()).await.unwrap();
    settle(Duration::from_millis(100)).await;
    h.events.send(munich()).await.unwrap();
    settle(Duration::from_secs(1)).await;

    assert_eq!(query.call_count(), 1);
    let request = query.requests()[0];
    assert!(request
        .bounds()
        .contains(&GeoPoint::new(48.135, 11.58).unwrap()));

    let published = h.state.current_points();
    assert_eq!(published.generation, 1);
    assert_eq!(published.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_fetch_before_debounce_elapses() {
    let query = MockQuery::new(Duration::from_millis(10));
    let h = start(Arc::clone(&query));

    h.events.send(hamburg()).await.unwrap();
    settle(Duration::from_millis(200)).await;
    assert_eq!(query.call_count(), 0);

    settle(Duration::from_millis(200)).await;
    assert_eq!(query.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_newer_fetch_supersedes_slow_one() {
    let query = MockQuery::new(Duration::from_secs(10));
    let h = start(Arc::clone(&query));

    h.events.send(hamburg()).await.unwrap();
    settle(Duration::from_millis(400)).await;
    assert_eq!(query.call_count(), 1);

    h.events.send(munich()).await.unwrap();
    settle(Duration::from_secs(12)).await;

    assert_eq!(query.call_count(), 2);
    assert_eq!(query.max_active.load(Ordering::SeqCst), 1);

    // Only the newer result was published
    let published = h.state.current_points();
    assert_eq!(published.generation, 1);
    assert!(published.points[0].id.starts_with("node/48.1"));
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_nudging_within_one_cell_keeps_slow_fetch() {
    let query = MockQuery::new(Duration::from_secs(2));
    let h = start(Arc::clone(&query));

    // Each box stays strictly inside the same 0.01° grid cells
    for i in 0..6 {
        let shift = i as f64 * 0.0001;
        let bounds = BoundingBox::new(
            53.5512 + shift,
            9.9812 + shift,
            53.5588 + shift,
            9.9988 + shift,
        )
        .unwrap();
        h.events
            .send(ViewportEvent::ViewportChanged(Viewport::new(bounds, 16.0)))
            .await
            .unwrap();
        settle(Duration::from_millis(600)).await;
    }
    settle(Duration::from_secs(3)).await;

    assert_eq!(query.call_count(), 1);
    assert!(!query.calls.lock()[0].token.is_cancelled());
    assert_eq!(h.state.generation(), 1);
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_notifies_and_keeps_previous_points() {
    let query = MockQuery::new(Duration::from_millis(10));
    let mut h = start(Arc::clone(&query));

    h.events.send(hamburg()).await.unwrap();
    settle(Duration::from_secs(1)).await;
    assert_eq!(h.state.generation(), 1);

    query.fail_next(QueryError::Status {
        status: 504,
        message: "Gateway Timeout".to_string(),
    });
    h.events.send(munich()).await.unwrap();
    settle(Duration::from_secs(1)).await;

    assert_eq!(query.call_count(), 2);
    assert_eq!(h.state.generation(), 1);
    assert!(h.state.current_points().points[0]
        .id
        .starts_with("node/53.5"));

    let notification = h.notifications.try_recv().unwrap();
    assert!(notification.message.contains("504"));
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_cached_area_skips_network() {
    let query = MockQuery::new(Duration::from_millis(10));
    let h = start(Arc::clone(&query));

    h.events.send(hamburg()).await.unwrap();
    settle(Duration::from_secs(1)).await;
    h.events.send(munich()).await.unwrap();
    settle(Duration::from_secs(1)).await;
    h.events.send(hamburg()).await.unwrap();
    settle(Duration::from_secs(1)).await;

    assert_eq!(query.call_count(), 2);
    assert_eq!(h.state.generation(), 3);
    assert!(h.state.current_points().points[0]
        .id
        .starts_with("node/53.5"));
}

#[tokio::test(start_paused = true)]
async fn test_zoomed_out_viewport_never_fetches() {
    let query = MockQuery::new(Duration::from_millis(10));
    let h = start(Arc::clone(&query));

    let wide = BoundingBox::new(47.0, 5.0, 55.0, 15.0).unwrap();
    h.events
        .send(ViewportEvent::ViewportChanged(Viewport::new(wide, 6.0)))
        .await
        .unwrap();
    settle(Duration::from_secs(5)).await;

    assert_eq!(query.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_located_fetches_immediately() {
    let query = MockQuery::new(Duration::from_millis(10));
    let h = start(Arc::clone(&query));

    let here = GeoPoint::new(52.52, 13.405).unwrap();
    h.events.send(ViewportEvent::Located(here)).await.unwrap();
    settle(Duration::from_millis(50)).await;

    assert_eq!(query.call_count(), 1);
    assert!(matches!(query.requests()[0], QueryRequest::Around { .. }));
    assert_eq!(h.state.generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_bypasses_cache() {
    let query = MockQuery::new(Duration::from_millis(10));
    let h = start(Arc::clone(&query));

    h.events.send(hamburg()).await.unwrap();
    settle(Duration::from_secs(1)).await;
    h.events.send(ViewportEvent::Refresh).await.unwrap();
    settle(Duration::from_secs(1)).await;

    assert_eq!(query.call_count(), 2);
    assert_eq!(query.requests()[0], query.requests()[1]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_in_flight_fetch() {
    let query = MockQuery::new(Duration::from_secs(30));
    let h = start(Arc::clone(&query));

    h.events.send(hamburg()).await.unwrap();
    settle(Duration::from_millis(400)).await;
    assert_eq!(query.call_count(), 1);

    h.shutdown.cancel();
    let stats = h.task.await.unwrap();

    assert_eq!(stats.fetches_started, 1);
    assert_eq!(stats.completed, 0);
    assert!(query.calls.lock()[0].token.is_cancelled());
    assert_eq!(h.state.generation(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_sender_stops_controller() {
    let query = MockQuery::new(Duration::from_millis(10));
    let h = start(query);

    drop(h.events);
    let stats = h.task.await.unwrap();
    assert_eq!(stats.fetches_started, 0);
}
