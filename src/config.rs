use std::{env, fmt, fs, path::Path, str::FromStr};

use anyhow::{bail, Context, Result};
use geojson::{GeoJson, Value};
use regex::Regex;
use serde::Deserialize;

use crate::place::Coordinate;

pub const API_KEY_VAR: &str = "PLACES_API_KEY";

pub const DEFAULT_QUERY: &str = "coffee shops";

pub const DEFAULT_OUTPUT: &str = "assets/coffee.json";

// "lat,lng", e.g. "47.6464,-122.3355". Whitespace around either number is
// allowed.
const LATLNGPAT: &str = r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$";

/// Centers of the 1km circles swept when no coordinates are given.
pub const DEFAULT_COORDINATES: [Coordinate; 22] = [
    Coordinate::new(47.646431, -122.335499),
    Coordinate::new(47.637757, -122.357305),
    Coordinate::new(47.667322, -122.381464),
    Coordinate::new(47.696397, -122.374767),
    Coordinate::new(47.699731, -122.331796),
    Coordinate::new(47.730342, -122.363560),
    Coordinate::new(47.672106, -122.259184),
    Coordinate::new(47.631856, -122.304601),
    Coordinate::new(47.617278, -122.303571),
    Coordinate::new(47.616005, -122.321256),
    Coordinate::new(47.638334, -122.326750),
    Coordinate::new(47.621675, -122.337739),
    Coordinate::new(47.616931, -122.335163),
    Coordinate::new(47.621097, -122.356280),
    Coordinate::new(47.604802, -122.329135),
    Coordinate::new(47.627784, -122.215864),
    Coordinate::new(47.614593, -122.185645),
    Coordinate::new(47.667798, -122.123814),
    Coordinate::new(47.677045, -122.205543),
    Coordinate::new(47.704996, -122.212411),
    Coordinate::new(47.562736, -122.219772),
    Coordinate::new(47.742137, -122.225582),
];

/// The Places API key. Not printed by `Debug`.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Read the key from `PLACES_API_KEY`. A `.env` file should already have
    /// been loaded into the environment.
    pub fn from_env() -> Result<Self> {
        match env::var(API_KEY_VAR) {
            Ok(key) => key.parse(),
            Err(_) => bail!(
                "Please set {API_KEY_VAR} in the environment or a .env file"
            ),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl FromStr for ApiKey {
    type Err = anyhow::Error;

    fn from_str(key: &str) -> Result<Self> {
        let key = key.trim();
        if key.is_empty() {
            bail!("Please set {API_KEY_VAR} in the environment or a .env file");
        }
        Ok(ApiKey(key.to_owned()))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Parse "lat,lng" text into a coordinate.
pub fn parse_lat_lng(text: &str) -> Result<Coordinate> {
    let pattern = Regex::new(LATLNGPAT)?;
    let Some((_, [lat, lng])) =
        pattern.captures_iter(text).map(|c| c.extract()).next()
    else {
        bail!("expected LAT,LNG but got {text:?}");
    };
    checked(Coordinate::new(lat.parse()?, lng.parse()?))
}

/// Parse a search radius in meters. It must be finite and positive.
pub fn parse_radius(text: &str) -> Result<f64> {
    let radius: f64 = text.trim().parse()?;
    if !radius.is_finite() || radius <= 0.0 {
        bail!("radius must be a positive number of meters, got {text:?}");
    }
    Ok(radius)
}

fn checked(coordinate: Coordinate) -> Result<Coordinate> {
    if !coordinate.is_valid() {
        bail!("coordinate out of range: {coordinate}");
    }
    Ok(coordinate)
}

/// Load a coordinate list from a file.
///
/// If the extension is "csv", it is read as CSV with `latitude` and
/// `longitude` columns, otherwise it is read as GeoJSON and every `Point`
/// geometry is taken.
pub fn load_coordinates(path: &Path) -> Result<Vec<Coordinate>> {
    let coordinates = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => coordinates_from_csv(path),
        _ => coordinates_from_geojson(path),
    }
    .with_context(|| {
        format!("Failed to read coordinates from {}", path.display())
    })?;

    if coordinates.is_empty() {
        bail!("No coordinates found in {}", path.display());
    }
    Ok(coordinates)
}

/// The expected CSV structure.
#[derive(Debug, Deserialize)]
struct Record {
    latitude: f64,
    longitude: f64,
}

fn coordinates_from_csv(path: &Path) -> Result<Vec<Coordinate>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut coordinates = vec![];
    for (line, result) in rdr.deserialize::<Record>().enumerate() {
        let record =
            result.with_context(|| format!("Bad CSV record {}", line + 1))?;
        coordinates.push(checked(Coordinate::new(
            record.latitude,
            record.longitude,
        ))?);
    }
    Ok(coordinates)
}

fn coordinates_from_geojson(path: &Path) -> Result<Vec<Coordinate>> {
    let geojson = GeoJson::from_str(&fs::read_to_string(path)?)?;

    let geometries = match geojson {
        GeoJson::FeatureCollection(fc) => {
            fc.features.into_iter().filter_map(|f| f.geometry).collect()
        }
        GeoJson::Feature(f) => f.geometry.into_iter().collect(),
        GeoJson::Geometry(g) => vec![g],
    };

    let mut coordinates = vec![];
    for geometry in geometries {
        match geometry.value {
            // GeoJSON positions are lng, lat
            Value::Point(ref position) if position.len() >= 2 => {
                coordinates
                    .push(checked(Coordinate::new(position[1], position[0]))?);
            }
            _ => log::warn!("Skipping a geometry that is not a Point"),
        }
    }
    Ok(coordinates)
}
