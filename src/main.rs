use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use campus_nav::dataset::{self, FileFormat};
use campus_nav::{
    Config, Coordinate, Destination, Instruction, NavigationObserver, Navigator, PathNetwork,
    Progress, Route,
};
use clap::Parser;
use log::{info, warn};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct DatasetLoadError(PathBuf, #[source] dataset::Error);

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The path to the GeoJSON file with walkable paths (optionally gzip or bzip2 compressed)
    paths_file: PathBuf,

    /// Longitude of the start point
    start_lon: f64,

    /// Latitude of the start point
    start_lat: f64,

    /// Longitude of the end point
    end_lon: f64,

    /// Latitude of the end point
    end_lat: f64,

    /// GeoJSON file with named points, mentioned as landmarks in instructions
    #[arg(long)]
    places: Option<PathBuf>,

    /// Name of the destination, used in instructions
    #[arg(long, default_value = "destination")]
    label: String,

    /// GeoJSON LineString to replay as location samples, one per second
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Walking speed, in meters per second
    #[arg(long, default_value_t = Config::DEFAULT.walking_speed)]
    walking_speed: f64,

    /// Link path vertices closer than this many meters, even across paths (0 disables)
    #[arg(long, default_value_t = Config::DEFAULT.link_radius)]
    link_radius: f64,

    /// Positions farther than this many meters from the route are off route
    #[arg(long, default_value_t = Config::DEFAULT.off_route_distance)]
    off_route_distance: f64,

    /// Log debug messages
    #[arg(short, long)]
    verbose: bool,
}

struct LoggingObserver;

impl NavigationObserver for LoggingObserver {
    fn route_replaced(&self, route: &Route) {
        info!(
            "rerouted: {:.0} m, {} min",
            route.distance_meters,
            route.duration_minutes()
        );
    }

    fn step_advanced(&self, index: usize, instruction: &Instruction) {
        info!("step {index}: {}", instruction.text);
    }

    fn off_route(&self, progress: &Progress) {
        warn!("off route, {:.0} m left", progress.total_remaining_meters);
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    colog::default_builder()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let config = Config {
        walking_speed: cli.walking_speed,
        link_radius: cli.link_radius,
        off_route_distance: cli.off_route_distance,
        ..Config::DEFAULT
    };
    let paths = load(&cli.paths_file, dataset::paths_from_file)?;
    let places = match &cli.places {
        Some(path) => load(path, dataset::places_from_file)?,
        None => vec![],
    };

    let network = PathNetwork::new(paths, places, &config);
    let navigator = Navigator::new(network, config).with_observer(LoggingObserver);

    let start = Coordinate::new(cli.start_lon, cli.start_lat);
    let end = Coordinate::new(cli.end_lon, cli.end_lat);
    let route = navigator.compute_route(start, end, &cli.label)?;

    info!(
        "route to {}: {} km, {} min",
        cli.label,
        route.distance_km(),
        route.duration_minutes()
    );
    for instruction in &route.instructions {
        info!("  {} ({:.0} m)", instruction.text, instruction.distance_meters);
    }

    println!("{}", serde_json::to_string_pretty(&route.to_geojson())?);

    if let Some(trace_file) = &cli.trace {
        let trace: Vec<Coordinate> = load(trace_file, dataset::paths_from_file)?
            .into_iter()
            .flat_map(|p| p.coords)
            .collect();
        replay(&navigator, route, Destination::new(end, cli.label), &trace)?;
    }

    Ok(())
}

fn load<T, P: AsRef<Path>>(
    path: P,
    loader: fn(P, FileFormat) -> Result<T, dataset::Error>,
) -> Result<T, DatasetLoadError> {
    let display = PathBuf::from(path.as_ref());
    loader(path, FileFormat::Unknown).map_err(|e| DatasetLoadError(display, e))
}

fn replay(
    navigator: &Navigator,
    route: Route,
    destination: Destination,
    trace: &[Coordinate],
) -> Result<(), campus_nav::RoutingError> {
    let mut session = navigator.begin_navigation(route, destination)?;
    let t0 = Instant::now();

    for (i, &sample) in trace.iter().enumerate() {
        let now = t0 + Duration::from_secs(i as u64);
        let progress = navigator.on_location_update(&mut session, Some(sample), now)?;
        info!(
            "t+{i}s: step {}, {:.0} m to next, {:.0} m / {:.0} s left",
            progress.current_step_index,
            progress.distance_to_next_step_meters,
            progress.total_remaining_meters,
            progress.estimated_remaining_seconds
        );

        if session.has_arrived(navigator.config()) {
            info!("arrived");
            break;
        }
    }

    navigator.end_navigation(&mut session);
    Ok(())
}
