//! Bounded, time-expiring store of query results.
//!
//! Entries are keyed by a quantized viewport ([`CacheKey`]) and hold the
//! points returned for that area. Two limits apply:
//!
//! - **Expiry**: an entry older than the configured duration is never
//!   returned, and is dropped when a lookup finds it stale.
//! - **Entry ceiling**: inserting a new key while the store is full first
//!   evicts the oldest half of the entries (by insertion time).
//!
//! The store is only written by the fetch activity, but lookups and stats may
//! come from anywhere, so state sits behind a `parking_lot::Mutex` with
//! lock-free counters alongside.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::key::CacheKey;
use crate::poi::PoiList;

/// Default maximum number of cached viewports.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Default entry lifetime (5 minutes).
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(5 * 60);

/// Cache limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries held after any insert (at least 1).
    pub max_entries: usize,
    /// Entries at least this old are treated as absent.
    pub expiry: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            expiry: DEFAULT_EXPIRY,
        }
    }
}

/// One cached query result. Never mutated after insertion.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub points: PoiList,
    pub inserted_at: Instant,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub evictions: u64,
    pub entry_count: usize,
}

/// In-memory viewport cache with expiry and half-eviction.
#[derive(Debug)]
pub struct SpatialCache {
    config: CacheConfig,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    evictions: AtomicU64,
}

impl Default for SpatialCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl SpatialCache {
    /// Create a cache with the given limits.
    ///
    /// A `max_entries` of zero is raised to one.
    pub fn new(config: CacheConfig) -> Self {
        let config = CacheConfig {
            max_entries: config.max_entries.max(1),
            ..config
        };

        Self {
            entries: Mutex::new(HashMap::with_capacity(config.max_entries)),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a fresh entry.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.get_at(key, Instant::now())
    }

    /// Look up an entry as of `now`.
    ///
    /// Returns `None` when the entry is missing or `now - inserted_at` has
    /// reached the expiry duration; a stale entry is removed.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<CacheEntry> {
        let mut entries = self.entries.lock();

        let fresh = match entries.get(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(entry) => now.saturating_duration_since(entry.inserted_at) < self.config.expiry,
        };

        if fresh {
            self.hits.fetch_add(1, Ordering::Relaxed);
            entries.get(key).cloned()
        } else {
            entries.remove(key);
            self.expired.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "Cache entry expired");
            None
        }
    }

    /// Insert a result stamped with the current time.
    pub fn put(&self, key: CacheKey, points: PoiList) {
        self.put_at(key, points, Instant::now());
    }

    /// Insert a result stamped with `now`.
    ///
    /// When `key` is new and the store is at or above its ceiling, the oldest
    /// half of the entries (rounded up) is evicted first. Replacing an
    /// existing key does not grow the store and evicts nothing.
    pub fn put_at(&self, key: CacheKey, points: PoiList, now: Instant) {
        let mut entries = self.entries.lock();

        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            let evicted = Self::evict_oldest_half(&mut entries);
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::debug!(
                evicted,
                remaining = entries.len(),
                "Cache full, evicted oldest entries"
            );
        }

        entries.insert(
            key,
            CacheEntry {
                key,
                points,
                inserted_at: now,
            },
        );
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        tracing::debug!(removed, "Cache cleared");
    }

    /// Number of entries currently held (including not-yet-pruned stale ones).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured limits.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.len(),
        }
    }

    fn evict_oldest_half(entries: &mut HashMap<CacheKey, CacheEntry>) -> usize {
        let mut by_age: Vec<(Instant, CacheKey)> = entries
            .values()
            .map(|entry| (entry.inserted_at, entry.key))
            .collect();
        by_age.sort_by_key(|(inserted_at, _)| *inserted_at);

        let count = by_age.len().div_ceil(2);
        for (_, key) in by_age.into_iter().take(count) {
            entries.remove(&key);
        }
        count
    }
}
