//! Settings structs mirroring the sections of `config.ini`.
//!
//! Values are kept in file units (milliseconds, seconds, degrees). The
//! `*_config()` accessors convert them into the typed configs consumed by
//! the core components.

use std::time::Duration;

use crate::ar::{ArConfig, ProjectorConfig};
use crate::cache::CacheConfig;
use crate::fetch::config as fetch_defaults;
use crate::fetch::FetchConfig;
use crate::query::{QueryConfig, DEFAULT_AMENITY, DEFAULT_ENDPOINT, DEFAULT_QUERY_TIMEOUT};

/// `[query]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub amenity: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_QUERY_TIMEOUT.as_secs(),
            amenity: DEFAULT_AMENITY.to_string(),
        }
    }
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub min_zoom: f64,
    pub debounce_base_ms: u64,
    pub debounce_per_level_ms: u64,
    pub debounce_max_ms: u64,
    pub reference_zoom: f64,
    pub grid_step_deg: f64,
    pub overlap_threshold: f64,
    pub comparable_area_ratio: f64,
    pub max_area_sq_deg: f64,
    pub location_radius_m: f64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            min_zoom: fetch_defaults::DEFAULT_MIN_FETCH_ZOOM,
            debounce_base_ms: fetch_defaults::DEFAULT_DEBOUNCE_BASE.as_millis() as u64,
            debounce_per_level_ms: fetch_defaults::DEFAULT_DEBOUNCE_PER_LEVEL.as_millis() as u64,
            debounce_max_ms: fetch_defaults::DEFAULT_DEBOUNCE_MAX.as_millis() as u64,
            reference_zoom: fetch_defaults::DEFAULT_REFERENCE_ZOOM,
            grid_step_deg: fetch_defaults::DEFAULT_GRID_STEP_DEG,
            overlap_threshold: fetch_defaults::DEFAULT_OVERLAP_THRESHOLD,
            comparable_area_ratio: fetch_defaults::DEFAULT_COMPARABLE_AREA_RATIO,
            max_area_sq_deg: fetch_defaults::DEFAULT_MAX_AREA_SQ_DEG,
            location_radius_m: fetch_defaults::DEFAULT_LOCATION_RADIUS_M,
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub expiry_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            max_entries: defaults.max_entries,
            expiry_secs: defaults.expiry.as_secs(),
        }
    }
}

/// `[ar]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ArSettings {
    pub max_distance_m: f64,
    pub fov_deg: f64,
    pub max_rendered: usize,
    pub edge_margin: f64,
    pub frame_interval_ms: u64,
}

impl Default for ArSettings {
    fn default() -> Self {
        let defaults = ArConfig::default();
        Self {
            max_distance_m: defaults.projector.max_distance_m,
            fov_deg: defaults.projector.horizontal_fov_deg,
            max_rendered: defaults.projector.max_rendered,
            edge_margin: defaults.projector.edge_margin,
            frame_interval_ms: defaults.frame_interval.as_millis() as u64,
        }
    }
}

/// Complete contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub query: QuerySettings,
    pub fetch: FetchSettings,
    pub cache: CacheSettings,
    pub ar: ArSettings,
}

impl ConfigFile {
    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            endpoint: self.query.endpoint.clone(),
            timeout: Duration::from_secs(self.query.timeout_secs),
            amenity: self.query.amenity.clone(),
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let f = &self.fetch;
        FetchConfig {
            min_fetch_zoom: f.min_zoom,
            debounce_base: Duration::from_millis(f.debounce_base_ms),
            debounce_per_level: Duration::from_millis(f.debounce_per_level_ms),
            debounce_max: Duration::from_millis(f.debounce_max_ms),
            reference_zoom: f.reference_zoom,
            grid_step_deg: f.grid_step_deg,
            overlap_threshold: f.overlap_threshold,
            comparable_area_ratio: f.comparable_area_ratio,
            max_area_sq_deg: f.max_area_sq_deg,
            location_radius_m: f.location_radius_m,
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.cache.max_entries,
            expiry: Duration::from_secs(self.cache.expiry_secs),
        }
    }

    /// Projection settings; screen geometry keeps its defaults.
    pub fn projector_config(&self) -> ProjectorConfig {
        ProjectorConfig {
            max_distance_m: self.ar.max_distance_m,
            horizontal_fov_deg: self.ar.fov_deg,
            max_rendered: self.ar.max_rendered,
            edge_margin: self.ar.edge_margin,
            ..ProjectorConfig::default()
        }
    }

    pub fn ar_config(&self) -> ArConfig {
        ArConfig {
            projector: self.projector_config(),
            frame_interval: Duration::from_millis(self.ar.frame_interval_ms),
        }
    }
}
