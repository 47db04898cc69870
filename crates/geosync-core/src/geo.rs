//! Great-circle helpers.

use crate::types::LatLng;

/// Mean earth radius in meters (same constant web map libraries use for
/// `distance()`).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters in one international mile.
pub const METERS_PER_MILE: f64 = 1_609.344;

/// Haversine distance between two coordinates, in meters.
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Converts miles to meters.
pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

/// Converts meters to miles.
pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Coordinate `distance_m` meters from `origin` along `bearing_deg`
/// (clockwise from north).
pub fn destination(origin: LatLng, bearing_deg: f64, distance_m: f64) -> LatLng {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lng2 = lng1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    LatLng::new(lat2.to_degrees(), lng2.to_degrees())
}
