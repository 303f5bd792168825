//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written to `config.ini`.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let q = &config.query;
    let f = &config.fetch;
    let c = &config.cache;
    let a = &config.ar;

    format!(
        r#"[query]
; Overpass API interpreter used to look up drinking water sources
endpoint = {}
; Request timeout in seconds (also sent to the server as [timeout:N])
timeout_secs = {}
; OpenStreetMap amenity tag value to search for
amenity = {}

[fetch]
; No lookups below this map zoom level
min_zoom = {}
; Debounce after the map stops moving: base + per_level * (reference_zoom - zoom), capped at max
debounce_base_ms = {}
debounce_per_level_ms = {}
debounce_max_ms = {}
; Zoom level where the base debounce and grid step apply
reference_zoom = {}
; Cache grid cell size in degrees at reference_zoom (doubles per zoom level out)
grid_step_deg = {}
; Skip a lookup when the new view overlaps the shown area by more than this fraction
overlap_threshold = {}
; ...and is at most this many times larger than the shown area
comparable_area_ratio = {}
; Never query an area larger than this (square degrees)
max_area_sq_deg = {}
; Search radius in metres around a freshly located user
location_radius_m = {}

[cache]
; Maximum number of cached map areas (oldest half is dropped when full)
max_entries = {}
; Seconds before a cached area is looked up again
expiry_secs = {}

[ar]
; Ignore water sources farther away than this (metres)
max_distance_m = {}
; Horizontal camera field of view in degrees
fov_deg = {}
; Maximum markers shown at once
max_rendered = {}
; Fraction of the half screen width used at the edge of the field of view
edge_margin = {}
; Milliseconds between overlay frames
frame_interval_ms = {}
"#,
        q.endpoint,
        q.timeout_secs,
        q.amenity,
        f.min_zoom,
        f.debounce_base_ms,
        f.debounce_per_level_ms,
        f.debounce_max_ms,
        f.reference_zoom,
        f.grid_step_deg,
        f.overlap_threshold,
        f.comparable_area_ratio,
        f.max_area_sq_deg,
        f.location_radius_m,
        c.max_entries,
        c.expiry_secs,
        a.max_distance_m,
        a.fov_deg,
        a.max_rendered,
        a.edge_margin,
        a.frame_interval_ms,
    )
}
