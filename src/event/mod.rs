use serde::{Deserialize, Serialize};

mod validation;
#[cfg(test)]
mod tests;

pub use validation::{validate, ValidationError};

/// Geographic coordinate in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "lat")]
    pub latitude: f64,

    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// PositionEvent is a single vehicle position report.
///
/// Input and output share this shape: enrichment only fills in `speed_mph`.
/// Field names on the wire follow the upstream bus position record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionEvent {
    /// Opaque vehicle identifier (partition key)
    #[serde(rename = "id")]
    pub vehicle_id: String,

    /// Reported position
    pub location: Location,

    /// Unix epoch seconds (producer time)
    pub timestamp: i64,

    /// Derived speed, unset until a prior observation exists
    #[serde(rename = "milesPerHour", default, skip_serializing_if = "Option::is_none")]
    pub speed_mph: Option<f64>,
}

impl PositionEvent {
    pub fn new(vehicle_id: impl Into<String>, location: Location, timestamp: i64) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            location,
            timestamp,
            speed_mph: None,
        }
    }

    /// Checks the decoded event before it is admitted to the pipeline.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
