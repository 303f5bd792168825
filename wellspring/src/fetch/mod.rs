//! Viewport-driven fetching.
//!
//! Decides when the visible map area needs points of interest from the
//! remote source, and keeps at most one query outstanding.
//!
//! - [`config`]: tuning knobs and their defaults
//! - [`policy`]: pure debounce, grid and skip rules
//! - [`controller`]: the event-driven state machine

pub mod config;
pub mod controller;
pub mod policy;
mod state;

pub use config::FetchConfig;
pub use controller::{
    FetchDecision, FetchTicket, Viewport, ViewportEvent, ViewportFetchController,
    EVENT_CHANNEL_CAPACITY,
};
pub use state::{FetchOutcome, FetchPhase, FetchStats, SkipReason};
