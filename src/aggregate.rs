use std::{
    collections::HashSet,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};

use crate::{
    fetch::{FetchError, PageFetcher},
    place::{Coordinate, Place},
    search::SearchApi,
};

/// Places keyed by formatted address, first seen wins.
#[derive(Debug, Default)]
pub struct UniquePlaces {
    addresses: HashSet<String>,
    places: Vec<Place>,
}

impl UniquePlaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the place unless it has no address or its address is taken.
    /// Returns whether it was added.
    pub fn insert(&mut self, place: Place) -> bool {
        let Some(address) = place.formatted_address() else {
            return false;
        };
        if !self.addresses.insert(address.to_owned()) {
            return false;
        }
        self.places.push(place);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// The places in insertion order.
    pub fn into_vec(self) -> Vec<Place> {
        self.places
    }
}

/// What a sweep over the coordinates produced.
#[derive(Debug)]
pub struct AggregateSummary {
    pub places: Vec<Place>,
    pub searched: usize,
    pub failed: Vec<(Coordinate, FetchError)>,
}

/// Search around every coordinate in order and collect the unique places.
///
/// A coordinate whose search fails contributes nothing; the sweep goes on.
pub async fn aggregate<A: SearchApi>(
    fetcher: &PageFetcher<A>,
    coordinates: &[Coordinate],
) -> AggregateSummary {
    let mut unique = UniquePlaces::new();
    let mut failed = vec![];

    for (i, &at) in coordinates.iter().enumerate() {
        log::info!("Searching near: {at} ({}/{})", i + 1, coordinates.len());
        match fetcher.fetch(at).await {
            Ok(places) => {
                let found = places.len();
                let added = places
                    .into_iter()
                    .map(|p| unique.insert(p))
                    .filter(|&new| new)
                    .count();
                log::debug!("{found} places near {at}, {added} new");
            }
            Err(e) => {
                log::error!("Error making request near {at}: {e}");
                if let Some(body) = e.source.body() {
                    log::error!("Response: {body}");
                }
                failed.push((at, e));
            }
        }
    }

    AggregateSummary {
        places: unique.into_vec(),
        searched: coordinates.len(),
        failed,
    }
}

/// Write the count and one line per place for the operator.
pub fn report<W: Write>(
    mut out: W,
    query: &str,
    places: &[Place],
) -> io::Result<()> {
    writeln!(
        out,
        "\nFound {} unique places for {query:?} in all locations:",
        places.len()
    )?;
    writeln!(out, "{}", "-".repeat(50))?;
    for (i, place) in places.iter().enumerate() {
        writeln!(
            out,
            "{}. {} ({})",
            i + 1,
            place.display_name().unwrap_or("N/A"),
            place.formatted_address().unwrap_or("N/A")
        )?;
    }
    Ok(())
}

/// Write the places as a pretty JSON array, replacing the file.
pub fn write_places(path: &Path, places: &[Place]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, places)?;
    writer.flush()?;
    Ok(())
}

/// Make sure the output file can be written before any searching starts.
/// The file is created if needed but not truncated.
pub fn check_writable(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create {}", dir.display()))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .with_context(|| format!("Cannot write to {}", path.display()))?;
    Ok(())
}
