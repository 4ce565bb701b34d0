use std::{io, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};

pub mod aggregate;
pub mod config;
pub mod fetch;
pub mod place;
pub mod search;

use aggregate::{aggregate, check_writable, report, write_places};
use config::{
    load_coordinates, parse_lat_lng, parse_radius, ApiKey, DEFAULT_COORDINATES,
    DEFAULT_OUTPUT, DEFAULT_QUERY,
};
use fetch::{PageFetcher, MAX_PAGE_COUNT, SEARCH_RADIUS_METERS};
use place::Coordinate;
use search::PlacesClient;

/// Search for places around a grid of coordinates with the Google Places
/// text search, and save every place found, once per address, as JSON.
///
/// The API key is read from PLACES_API_KEY, or from a .env file in the
/// current directory.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Text to search for around each coordinate
    #[arg(short, long, value_name = "TEXT", default_value = DEFAULT_QUERY)]
    query: String,

    /// Output filename, JSON formatted. Overwritten if it exists.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// File with the coordinates to search around
    ///
    /// If the extension is "csv", it is interpreted as CSV with "latitude"
    /// and "longitude" columns, otherwise it is interpreted as GeoJSON and
    /// every Point is used. Without this or --at, a built-in grid over
    /// Seattle is searched.
    #[arg(short, long, value_name = "FILE", conflicts_with = "at")]
    coordinates: Option<PathBuf>,

    /// A coordinate to search around, e.g. 47.6464,-122.3355. Repeatable.
    #[arg(
        long,
        value_name = "LAT,LNG",
        value_parser = parse_lat_lng,
        allow_hyphen_values = true
    )]
    at: Vec<Coordinate>,

    /// Maximum pages of 20 results to fetch per coordinate
    #[arg(
        long,
        value_name = "N",
        default_value_t = MAX_PAGE_COUNT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_pages: u32,

    /// Search radius around each coordinate, in meters
    #[arg(
        long,
        value_name = "METERS",
        default_value_t = SEARCH_RADIUS_METERS,
        value_parser = parse_radius
    )]
    radius: f64,
}

/// Log to stderr at `info` unless RUST_LOG says otherwise.
pub fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();
}

/// Run the command-line interface
pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let api_key = ApiKey::from_env()?;

    let coordinates = match (&cli.coordinates, cli.at.is_empty()) {
        (Some(path), _) => load_coordinates(path)?,
        (None, false) => cli.at.clone(),
        (None, true) => DEFAULT_COORDINATES.to_vec(),
    };

    // check that we can write to the output file, without overwriting, before
    // spending lots of time searching
    check_writable(&cli.output)?;

    let fetcher = PageFetcher::new(PlacesClient::new(api_key), &cli.query)
        .max_pages(cli.max_pages)
        .radius(cli.radius);
    let summary = aggregate(&fetcher, &coordinates).await;

    if !summary.failed.is_empty() {
        log::warn!(
            "{} of {} coordinates failed and contributed no places",
            summary.failed.len(),
            summary.searched
        );
    }

    report(io::stdout().lock(), &cli.query, &summary.places)?;
    write_places(&cli.output, &summary.places)?;
    println!("\nResults saved to {}", cli.output.display());

    Ok(())
}
