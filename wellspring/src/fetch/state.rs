//! Fetch lifecycle types.

use std::fmt;

/// Where the controller is in the Idle -> Scheduled -> InFlight cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// Nothing pending.
    Idle,
    /// A debounce timer is running for the latest viewport.
    Scheduled,
    /// A query is outstanding.
    InFlight,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPhase::Idle => write!(f, "idle"),
            FetchPhase::Scheduled => write!(f, "scheduled"),
            FetchPhase::InFlight => write!(f, "in flight"),
        }
    }
}

/// Why a fetch decision ended without a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Viewport zoom is below the minimum fetch zoom.
    BelowMinZoom,
    /// The published set already covers the viewport.
    Overlapping,
    /// The quantized query box exceeds the area ceiling.
    AreaTooLarge,
    /// No viewport or position has been reported yet.
    NoViewport,
    /// The outstanding query already covers the same grid cell.
    AlreadyInFlight,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::BelowMinZoom => "zoom below fetch threshold",
            SkipReason::Overlapping => "already covered",
            SkipReason::AreaTooLarge => "area too large",
            SkipReason::NoViewport => "no viewport",
            SkipReason::AlreadyInFlight => "same cell already in flight",
        };
        write!(f, "{}", text)
    }
}

/// Result of the most recent fetch decision or completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A query succeeded and its points were published.
    Completed { count: usize },
    /// A cached entry was published without a query.
    CacheHit { count: usize },
    /// Nothing was requested.
    Skipped(SkipReason),
    /// The query was superseded.
    Cancelled,
    /// The query failed; the previous set stays published.
    Failed { status: Option<u16>, message: String },
}

impl FetchOutcome {
    /// Whether new points were published.
    pub fn published(&self) -> bool {
        matches!(
            self,
            FetchOutcome::Completed { .. } | FetchOutcome::CacheHit { .. }
        )
    }
}

/// Counters kept by the controller task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub fetches_started: u64,
    pub completed: u64,
    pub cache_hits: u64,
    pub skipped: u64,
    pub cancelled: u64,
    pub failed: u64,
}
