//! Nearby command - query around a point and preview the AR overlay.

use clap::Args;
use console::style;
use tokio_util::sync::CancellationToken;

use wellspring::ar::{format_distance, project, ArFrame, ProjectorConfig};
use wellspring::config::ConfigFile;
use wellspring::geo::{distance_meters, initial_bearing_degrees, normalize_bearing, GeoPoint};
use wellspring::poi::PointOfInterest;
use wellspring::query::{OverpassClient, QueryRequest, SpatialQuery};

use crate::error::CliError;

/// Arguments for `wellspring nearby`.
#[derive(Debug, Args)]
pub struct NearbyArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Compass heading the camera faces, degrees clockwise from north
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub heading: f64,

    /// Search radius in meters (default: fetch.location_radius_m)
    #[arg(long, allow_hyphen_values = true)]
    pub radius: Option<f64>,

    /// Horizontal field of view in degrees (default: ar.fov_deg)
    #[arg(long, allow_hyphen_values = true)]
    pub fov: Option<f64>,

    /// Farthest marker distance in meters (default: ar.max_distance_m)
    #[arg(long, allow_hyphen_values = true)]
    pub max_distance: Option<f64>,
}

impl NearbyArgs {
    /// Reject values the query or projection cannot use.
    ///
    /// Coordinates are checked separately by [`GeoPoint::new`].
    fn validate(&self) -> Result<(), CliError> {
        if !self.heading.is_finite() {
            return Err(CliError::invalid("heading", "must be a number of degrees"));
        }
        if let Some(radius) = self.radius {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(CliError::invalid(
                    "radius",
                    "must be a positive number of meters",
                ));
            }
        }
        if let Some(fov) = self.fov {
            if !(1.0..=360.0).contains(&fov) {
                return Err(CliError::invalid("fov", "must be between 1 and 360 degrees"));
            }
        }
        if let Some(max_distance) = self.max_distance {
            if !(max_distance.is_finite() && max_distance > 0.0) {
                return Err(CliError::invalid(
                    "max-distance",
                    "must be a positive number of meters",
                ));
            }
        }
        Ok(())
    }
}

/// One result row: distance and bearing from the user.
struct Ranked<'a> {
    poi: &'a PointOfInterest,
    distance_m: f64,
    bearing_deg: f64,
}

/// Run the nearby command.
pub fn run(args: NearbyArgs) -> Result<(), CliError> {
    args.validate()?;
    let config = ConfigFile::load()?;
    let user = GeoPoint::new(args.lat, args.lon)?;
    let radius_m = args.radius.unwrap_or(config.fetch.location_radius_m);

    let mut projector = config.projector_config();
    if let Some(fov) = args.fov {
        projector = projector.with_fov(fov);
    }
    if let Some(max_distance) = args.max_distance {
        projector = projector.with_max_distance(max_distance);
    }

    let client = OverpassClient::new(config.query_config())?;
    let request = QueryRequest::Around {
        center: user,
        radius_m,
    };

    println!(
        "Searching {} around {:.5}, {:.5} via {}...",
        format_distance(radius_m),
        user.latitude,
        user.longitude,
        style(&config.query.endpoint).dim()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let result: wellspring::error::Result<Vec<PointOfInterest>> = runtime.block_on(async {
        let cancellation = CancellationToken::new();
        let on_interrupt = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        Ok(client.query(request, cancellation).await?)
    });

    let points = match result {
        Ok(points) => points,
        Err(e) if !e.is_user_visible() => {
            tracing::info!("Nearby query interrupted");
            println!("{}", style("Cancelled.").yellow());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(count = points.len(), radius_m, "Nearby query complete");
    println!();

    let ranked = rank_by_distance(&user, &points);
    print_ranked(&ranked);

    let heading = normalize_bearing(args.heading);
    let frame = project(&projector, heading, &user, &points);
    println!();
    print_frame(&projector, &frame);

    Ok(())
}

/// Points sorted by distance from `user`, closest first.
fn rank_by_distance<'a>(user: &GeoPoint, points: &'a [PointOfInterest]) -> Vec<Ranked<'a>> {
    let mut ranked: Vec<Ranked<'a>> = points
        .iter()
        .map(|poi| Ranked {
            poi,
            distance_m: distance_meters(user, &poi.position),
            bearing_deg: initial_bearing_degrees(user, &poi.position),
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    ranked
}

/// Eight-point compass label for a bearing.
fn compass_point(bearing_deg: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = ((normalize_bearing(bearing_deg) + 22.5) / 45.0) as usize % 8;
    POINTS[index]
}

fn print_ranked(ranked: &[Ranked<'_>]) {
    if ranked.is_empty() {
        println!("{}", style("No water sources found").yellow());
        return;
    }

    println!(
        "{}",
        style(format!("{} water sources", ranked.len()))
            .bold()
            .underlined()
    );
    for row in ranked {
        println!(
            "  {:>8}  {:<2} {:>4.0}°  {}  {}",
            style(format_distance(row.distance_m)).cyan(),
            compass_point(row.bearing_deg),
            normalize_bearing(row.bearing_deg),
            row.poi.display_name,
            style(&row.poi.id).dim()
        );
    }
}

fn print_frame(config: &ProjectorConfig, frame: &ArFrame<'_>) {
    println!(
        "{}",
        style(format!(
            "AR view facing {:.0}° ({}), {:.0}° field of view",
            frame.heading_deg,
            compass_point(frame.heading_deg),
            config.horizontal_fov_deg
        ))
        .bold()
        .underlined()
    );

    for marker in &frame.markers {
        println!(
            "  {:>+6.1}°  x={:>6.0} y={:>6.0} scale={:.2}  {} ({})",
            marker.relative_angle_deg,
            marker.screen_x,
            marker.screen_y,
            marker.scale,
            marker.poi.display_name,
            format_distance(marker.distance_m)
        );
    }

    println!("  {}", style(&frame.status).green());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poi(id: &str, lat: f64, lon: f64) -> PointOfInterest {
        PointOfInterest::new(id, GeoPoint::new(lat, lon).unwrap(), id)
    }

    #[test]
    fn test_rank_orders_by_distance() {
        let user = GeoPoint::new(0.0, 0.0).unwrap();
        let points = vec![
            poi("far", 0.01, 0.0),
            poi("near", 0.001, 0.0),
            poi("mid", 0.0, 0.005),
        ];

        let ranked = rank_by_distance(&user, &points);
        let ids: Vec<&str> = ranked.iter().map(|r| r.poi.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!((ranked[1].bearing_deg - 90.0).abs() < 0.01);
    }

    fn args(argv: &[&str]) -> NearbyArgs {
        #[derive(clap::Parser)]
        struct Wrapper {
            #[command(flatten)]
            nearby: NearbyArgs,
        }
        let mut full = vec!["nearby"];
        full.extend_from_slice(argv);
        <Wrapper as clap::Parser>::try_parse_from(full).unwrap().nearby
    }

    #[test]
    fn test_negative_values_parse() {
        let parsed = args(&["--lat", "-33.9", "--lon", "18.4", "--heading", "-90"]);
        assert_eq!(parsed.heading, -90.0);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_radius() {
        let negative = args(&["--lat", "0", "--lon", "0", "--radius", "-5"]);
        assert!(matches!(
            negative.validate(),
            Err(CliError::InvalidArgument { name: "radius", .. })
        ));

        let nan = args(&["--lat", "0", "--lon", "0", "--radius", "NaN"]);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_heading_and_fov() {
        let heading = args(&["--lat", "0", "--lon", "0", "--heading", "inf"]);
        assert!(heading.validate().is_err());

        let fov = args(&["--lat", "0", "--lon", "0", "--fov", "0"]);
        assert!(matches!(
            fov.validate(),
            Err(CliError::InvalidArgument { name: "fov", .. })
        ));

        let distance = args(&["--lat", "0", "--lon", "0", "--max-distance", "-1"]);
        assert!(distance.validate().is_err());
    }

    #[test]
    fn test_compass_point_boundaries() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(22.4), "N");
        assert_eq!(compass_point(22.6), "NE");
        assert_eq!(compass_point(180.0), "S");
        assert_eq!(compass_point(350.0), "N");
        assert_eq!(compass_point(-90.0), "W");
    }
}
