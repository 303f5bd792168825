//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.
//! Missing sections and keys keep their defaults; present keys are validated.

use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse `key` from `props` if present.
fn parse_key<T: FromStr>(
    props: &Properties,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ConfigFileError> {
    match props.get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, v, reason)),
    }
}

/// Parse a finite float that must satisfy `accept`.
fn parse_float(
    props: &Properties,
    section: &str,
    key: &str,
    reason: &str,
    accept: impl Fn(f64) -> bool,
) -> Result<Option<f64>, ConfigFileError> {
    let Some(v) = parse_key::<f64>(props, section, key, reason)? else {
        return Ok(None);
    };
    if !v.is_finite() || !accept(v) {
        let raw = props.get(key).unwrap_or_default();
        return Err(invalid(section, key, raw, reason));
    }
    Ok(Some(v))
}

/// Parse an integer that must be at least `min`.
fn parse_at_least<T: FromStr + PartialOrd + Copy>(
    props: &Properties,
    section: &str,
    key: &str,
    min: T,
    reason: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(v) = parse_key::<T>(props, section, key, reason)? else {
        return Ok(None);
    };
    if v < min {
        let raw = props.get(key).unwrap_or_default();
        return Err(invalid(section, key, raw, reason));
    }
    Ok(Some(v))
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [query] section
    if let Some(section) = ini.section(Some("query")) {
        if let Some(v) = section.get("endpoint") {
            let v = v.trim();
            if !v.is_empty() {
                if !(v.starts_with("http://") || v.starts_with("https://")) {
                    return Err(invalid(
                        "query",
                        "endpoint",
                        v,
                        "must be an http:// or https:// URL",
                    ));
                }
                config.query.endpoint = v.to_string();
            }
        }
        if let Some(v) = parse_at_least(
            section,
            "query",
            "timeout_secs",
            1u64,
            "must be a positive integer (seconds)",
        )? {
            config.query.timeout_secs = v;
        }
        if let Some(v) = section.get("amenity") {
            let v = v.trim();
            if v.is_empty() || v.contains('"') {
                return Err(invalid(
                    "query",
                    "amenity",
                    v,
                    "must be a non-empty tag value without quotes",
                ));
            }
            config.query.amenity = v.to_string();
        }
    }

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        let s = "fetch";
        let zoom = |z: f64| (0.0..=24.0).contains(&z);
        let positive = |x: f64| x > 0.0;

        if let Some(v) = parse_float(section, s, "min_zoom", "must be a zoom level 0-24", zoom)? {
            config.fetch.min_zoom = v;
        }
        if let Some(v) = parse_key(
            section,
            s,
            "debounce_base_ms",
            "must be an integer (milliseconds)",
        )? {
            config.fetch.debounce_base_ms = v;
        }
        if let Some(v) = parse_key(
            section,
            s,
            "debounce_per_level_ms",
            "must be an integer (milliseconds)",
        )? {
            config.fetch.debounce_per_level_ms = v;
        }
        if let Some(v) = parse_key(
            section,
            s,
            "debounce_max_ms",
            "must be an integer (milliseconds)",
        )? {
            config.fetch.debounce_max_ms = v;
        }
        if let Some(v) =
            parse_float(section, s, "reference_zoom", "must be a zoom level 0-24", zoom)?
        {
            config.fetch.reference_zoom = v;
        }
        if let Some(v) = parse_float(
            section,
            s,
            "grid_step_deg",
            "must be a positive number (degrees)",
            positive,
        )? {
            config.fetch.grid_step_deg = v;
        }
        if let Some(v) = parse_float(
            section,
            s,
            "overlap_threshold",
            "must be a fraction between 0 and 1",
            |x| (0.0..=1.0).contains(&x),
        )? {
            config.fetch.overlap_threshold = v;
        }
        if let Some(v) = parse_float(
            section,
            s,
            "comparable_area_ratio",
            "must be a number >= 1",
            |x| x >= 1.0,
        )? {
            config.fetch.comparable_area_ratio = v;
        }
        if let Some(v) = parse_float(
            section,
            s,
            "max_area_sq_deg",
            "must be a positive number (square degrees)",
            positive,
        )? {
            config.fetch.max_area_sq_deg = v;
        }
        if let Some(v) = parse_float(
            section,
            s,
            "location_radius_m",
            "must be a positive number (metres)",
            positive,
        )? {
            config.fetch.location_radius_m = v;
        }

        if config.fetch.debounce_max_ms < config.fetch.debounce_base_ms {
            return Err(invalid(
                s,
                "debounce_max_ms",
                &config.fetch.debounce_max_ms.to_string(),
                "must not be smaller than debounce_base_ms",
            ));
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = parse_at_least(
            section,
            "cache",
            "max_entries",
            1usize,
            "must be a positive integer",
        )? {
            config.cache.max_entries = v;
        }
        if let Some(v) = parse_at_least(
            section,
            "cache",
            "expiry_secs",
            1u64,
            "must be a positive integer (seconds)",
        )? {
            config.cache.expiry_secs = v;
        }
    }

    // [ar] section
    if let Some(section) = ini.section(Some("ar")) {
        if let Some(v) = parse_float(
            section,
            "ar",
            "max_distance_m",
            "must be a positive number (metres)",
            |x| x > 0.0,
        )? {
            config.ar.max_distance_m = v;
        }
        if let Some(v) = parse_float(
            section,
            "ar",
            "fov_deg",
            "must be between 1 and 360 (degrees)",
            |x| (1.0..=360.0).contains(&x),
        )? {
            config.ar.fov_deg = v;
        }
        if let Some(v) =
            parse_key(section, "ar", "max_rendered", "must be a non-negative integer")?
        {
            config.ar.max_rendered = v;
        }
        if let Some(v) = parse_float(
            section,
            "ar",
            "edge_margin",
            "must be a fraction between 0 and 1",
            |x| (0.0..=1.0).contains(&x),
        )? {
            config.ar.edge_margin = v;
        }
        if let Some(v) = parse_at_least(
            section,
            "ar",
            "frame_interval_ms",
            1u64,
            "must be a positive integer (milliseconds)",
        )? {
            config.ar.frame_interval_ms = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(text).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_overlays_values() {
        let config = parse(
            r#"
[query]
endpoint = https://overpass.example.org/api/interpreter
timeout_secs = 10
amenity = fountain

[fetch]
min_zoom = 13
overlap_threshold = 0.9
grid_step_deg = 0.005

[cache]
max_entries = 20
expiry_secs = 120

[ar]
fov_deg = 60
max_rendered = 4
"#,
        )
        .unwrap();

        assert_eq!(config.query.endpoint, "https://overpass.example.org/api/interpreter");
        assert_eq!(config.query.timeout_secs, 10);
        assert_eq!(config.query.amenity, "fountain");
        assert_eq!(config.fetch.min_zoom, 13.0);
        assert_eq!(config.fetch.overlap_threshold, 0.9);
        assert_eq!(config.fetch.grid_step_deg, 0.005);
        assert_eq!(config.cache.max_entries, 20);
        assert_eq!(config.cache.expiry_secs, 120);
        assert_eq!(config.ar.fov_deg, 60.0);
        assert_eq!(config.ar.max_rendered, 4);
        // Untouched keys keep defaults
        assert_eq!(config.ar.edge_margin, ConfigFile::default().ar.edge_margin);
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let err = parse("[cache]\nmax_entries = lots\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue {
                section,
                key,
                value,
                ..
            } => {
                assert_eq!(section, "cache");
                assert_eq!(key, "max_entries");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert!(parse("[fetch]\noverlap_threshold = 1.5\n").is_err());
        assert!(parse("[fetch]\ngrid_step_deg = 0\n").is_err());
        assert!(parse("[fetch]\nmin_zoom = NaN\n").is_err());
        assert!(parse("[cache]\nmax_entries = 0\n").is_err());
        assert!(parse("[ar]\nfov_deg = 400\n").is_err());
        assert!(parse("[query]\ntimeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_endpoint_must_be_http() {
        let err = parse("[query]\nendpoint = ftp://example.org\n").unwrap_err();
        assert!(err.to_string().contains("query.endpoint"));
    }

    #[test]
    fn test_debounce_max_below_base_rejected() {
        let err = parse("[fetch]\ndebounce_base_ms = 500\ndebounce_max_ms = 100\n").unwrap_err();
        assert!(err.to_string().contains("debounce_max_ms"));
    }
}
