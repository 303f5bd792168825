//! Viewport result cache.
//!
//! Query results are cached per quantized bounding box so that panning back
//! and forth over the same area does not re-query the remote source.

mod key;
mod spatial;

pub use key::CacheKey;
pub use spatial::{
    CacheConfig, CacheEntry, CacheStats, SpatialCache, DEFAULT_EXPIRY, DEFAULT_MAX_ENTRIES,
};
