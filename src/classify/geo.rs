pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in km, haversine formula.
/// Callers are responsible for supplying degrees in [-90, 90] / [-180, 180];
/// out-of-range input produces meaningless (possibly NaN) output.
pub fn distance_km(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let lat_a_rad = lat_a.to_radians();
    let lat_b_rad = lat_b.to_radians();
    let dlat = (lat_b - lat_a).to_radians();
    let dlon = (lon_b - lon_a).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat_a_rad.cos() * lat_b_rad.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}
