//! Great-circle distance between geographic coordinates.

use crate::event::Location;

/// Earth mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the great-circle distance between two positions.
///
/// Uses the haversine formula. Inputs are not range checked: out-of-range
/// coordinates still produce a number.
///
/// # Returns
///
/// Distance in kilometers, `0.0` for identical coordinates.
///
/// # Example
///
/// ```
/// use rtd_stream::event::Location;
/// use rtd_stream::geo::haversine_km;
///
/// // One degree of latitude is ~111 km
/// let dist = haversine_km(Location::new(0.0, 0.0), Location::new(1.0, 0.0));
/// assert!((dist - 111.19).abs() < 0.01);
/// ```
pub fn haversine_km(from: Location, to: Location) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_coordinates_are_zero() {
        let p = Location::new(39.7392, -104.9903);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_short_urban_hop() {
        let from = Location::new(39.7392, -104.9903);
        let to = Location::new(39.7400, -104.9900);

        let dist = haversine_km(from, to);
        assert!((dist - 0.0925).abs() < 0.001, "got {}", dist);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let denver = Location::new(39.7392, -104.9903);
        let boulder = Location::new(40.0150, -105.2705);

        let there = haversine_km(denver, boulder);
        let back = haversine_km(boulder, denver);
        assert!((there - back).abs() < 1e-9);
        // ~39 km between the two cities
        assert!((there - 39.0).abs() < 1.0, "got {}", there);
    }

    #[test]
    fn test_antipodal_points_are_half_circumference() {
        let dist = haversine_km(Location::new(0.0, 0.0), Location::new(0.0, 180.0));
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((dist - half).abs() < 1e-6);
    }

    #[test]
    fn test_crossing_the_antimeridian() {
        let west = Location::new(0.0, 179.5);
        let east = Location::new(0.0, -179.5);

        // One degree of longitude at the equator, not 359
        let dist = haversine_km(west, east);
        assert!((dist - 111.19).abs() < 0.01, "got {}", dist);
    }

    #[test]
    fn test_out_of_range_input_still_yields_a_number() {
        let dist = haversine_km(Location::new(95.0, 200.0), Location::new(-100.0, -400.0));
        assert!(dist.is_finite());
        assert!(dist >= 0.0);
    }
}
