use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A latitude, longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// One result entry from the places search.
///
/// The record is kept as the JSON object the API returned, so that it can be
/// written back out unchanged. Only the address and display name are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Place(Map<String, Value>);

impl Place {
    /// The `formattedAddress` field, if present and non-empty.
    pub fn formatted_address(&self) -> Option<&str> {
        self.0
            .get("formattedAddress")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
    }

    /// The `displayName.text` field.
    pub fn display_name(&self) -> Option<&str> {
        self.0
            .get("displayName")
            .and_then(|n| n.get("text"))
            .and_then(Value::as_str)
    }
}
