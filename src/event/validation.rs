use super::PositionEvent;
use std::fmt;

/// Validation errors raised at the decoding boundary
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingVehicleId,
    InvalidLatitude(f64),
    InvalidLongitude(f64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingVehicleId => write!(f, "vehicle id is required"),
            ValidationError::InvalidLatitude(lat) => {
                write!(f, "latitude must be within [-90, 90], got {}", lat)
            }
            ValidationError::InvalidLongitude(lon) => {
                write!(f, "longitude must be within [-180, 180], got {}", lon)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates a decoded PositionEvent.
///
/// Validation rules:
/// - Vehicle id: non-empty after trimming whitespace
/// - Latitude: finite, within [-90, 90]
/// - Longitude: finite, within [-180, 180]
///
/// The enrichment engine itself never validates; this runs in the source
/// before events are admitted.
pub fn validate(event: &PositionEvent) -> Result<(), ValidationError> {
    if event.vehicle_id.trim().is_empty() {
        return Err(ValidationError::MissingVehicleId);
    }

    let lat = event.location.latitude;
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::InvalidLatitude(lat));
    }

    let lon = event.location.longitude;
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ValidationError::InvalidLongitude(lon));
    }

    Ok(())
}
