//! Wellspring - find drinking water nearby, on the map and through the camera.
//!
//! This library provides the two engines behind the app:
//!
//! - **Viewport fetching** ([`fetch`]): debounced, cancelling, cache-backed
//!   lookups of drinking-water points as the map moves.
//! - **AR projection** ([`ar`]): places those points on a live camera view
//!   according to the device heading.
//!
//! Both share an [`AppState`](state::AppState) holding the current points,
//! the user position and the heading.

pub mod ar;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod heading;
pub mod location;
pub mod logging;
pub mod notify;
pub mod poi;
pub mod query;
pub mod state;

pub use error::WellspringError;
