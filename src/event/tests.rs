use super::*;
use serde_json::json;

fn denver(vehicle_id: &str) -> PositionEvent {
    PositionEvent::new(vehicle_id, Location::new(39.7392, -104.9903), 1_000)
}

#[test]
fn test_valid_event_passes_validation() {
    let event = denver("bus-1");
    assert!(event.validate().is_ok());
}

#[test]
fn test_missing_vehicle_id_fails() {
    let event = denver("");
    assert_eq!(event.validate().unwrap_err(), ValidationError::MissingVehicleId);

    let event = denver("   ");
    assert_eq!(event.validate().unwrap_err(), ValidationError::MissingVehicleId);
}

#[test]
fn test_latitude_out_of_range_fails() {
    let mut event = denver("bus-1");
    event.location.latitude = 91.0;

    match event.validate().unwrap_err() {
        ValidationError::InvalidLatitude(lat) => assert_eq!(lat, 91.0),
        other => panic!("Expected InvalidLatitude, got {:?}", other),
    }
}

#[test]
fn test_longitude_out_of_range_fails() {
    let mut event = denver("bus-1");
    event.location.longitude = -180.5;

    match event.validate().unwrap_err() {
        ValidationError::InvalidLongitude(lon) => assert_eq!(lon, -180.5),
        other => panic!("Expected InvalidLongitude, got {:?}", other),
    }
}

#[test]
fn test_non_finite_coordinate_fails() {
    let mut event = denver("bus-1");
    event.location.latitude = f64::NAN;
    assert!(matches!(
        event.validate(),
        Err(ValidationError::InvalidLatitude(_))
    ));
}

#[test]
fn test_boundary_coordinates_are_valid() {
    let event = PositionEvent::new("bus-1", Location::new(-90.0, 180.0), 1);
    assert!(event.validate().is_ok());
}

#[test]
fn test_deserialize_upstream_record() {
    let value = json!({
        "id": "6231",
        "location": { "lat": 39.7392, "lon": -104.9903 },
        "timestamp": 1_588_000_000
    });

    let event: PositionEvent = serde_json::from_value(value).unwrap();
    assert_eq!(event.vehicle_id, "6231");
    assert_eq!(event.location, Location::new(39.7392, -104.9903));
    assert_eq!(event.timestamp, 1_588_000_000);
    assert_eq!(event.speed_mph, None);
}

#[test]
fn test_unset_speed_is_omitted_on_the_wire() {
    let value = serde_json::to_value(denver("bus-1")).unwrap();
    assert!(value.get("milesPerHour").is_none());
    assert_eq!(value["location"]["lat"], json!(39.7392));
}

#[test]
fn test_speed_serialized_as_miles_per_hour() {
    let mut event = denver("bus-1");
    event.speed_mph = Some(20.5);

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["milesPerHour"], json!(20.5));
    assert_eq!(value["id"], json!("bus-1"));
}

#[test]
fn test_validation_error_display() {
    assert_eq!(
        ValidationError::MissingVehicleId.to_string(),
        "vehicle id is required"
    );
    assert_eq!(
        ValidationError::InvalidLatitude(95.0).to_string(),
        "latitude must be within [-90, 90], got 95"
    );
}
