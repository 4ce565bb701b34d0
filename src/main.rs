//! Searches for places around a grid of coordinates, removes duplicates by
//! address, and writes the unique places to a JSON file.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    places_sweep::run().await
}
