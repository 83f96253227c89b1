/// Meters per second to miles per hour.
///
/// Kept at four decimals so speeds match the upstream enriched topic exactly.
pub const MPS_TO_MPH: f64 = 2.2369;

/// Speed in miles per hour for `distance_km` covered in `elapsed_seconds`.
///
/// Zero elapsed time is "no measurable motion" and yields `0.0`. Negative
/// elapsed time (out-of-order arrival) is not special-cased and yields a
/// negative speed.
pub fn speed_mph(distance_km: f64, elapsed_seconds: i64) -> f64 {
    if elapsed_seconds == 0 {
        return 0.0;
    }

    let meters_per_second = distance_km * 1000.0 / elapsed_seconds as f64;
    meters_per_second * MPS_TO_MPH
}
