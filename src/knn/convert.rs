//! Degree/radian conversion and great-circle distance.
//!
//! Distances assume a spherical Earth of radius [`EARTH_RADIUS_M`]. Against the
//! WGS84 ellipsoid this is off by up to about 0.5%, which is fine for
//! regional (sub-100 km) matching but should not be used for surveying.
//!
//! Coordinates are not range-checked here. Out-of-range longitudes or
//! latitudes produce distances that are silently wrong; enable
//! `validate_coordinates` on the matcher config to reject them up front.

use crate::models::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Convert points to `[lon_rad, lat_rad]` pairs, preserving order.
pub fn to_radians<'a, I>(points: I) -> Vec<[f64; 2]>
where
    I: IntoIterator<Item = &'a GeoPoint>,
{
    points.into_iter().map(GeoPoint::to_radians).collect()
}

/// Angular distance to meters on a sphere of the given radius.
pub fn rad_to_meters(distance_rad: f64, radius_m: f64) -> f64 {
    distance_rad * radius_m
}

/// Meters to angular distance on a sphere of the given radius.
pub fn meters_to_rad(distance_m: f64, radius_m: f64) -> f64 {
    distance_m / radius_m
}

/// Haversine angular distance (radians) between two `[lon_rad, lat_rad]` points.
pub fn haversine(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let d_lon = b[0] - a[0];
    let d_lat = b[1] - a[1];

    let h = (d_lat / 2.0).sin().powi(2) + a[1].cos() * b[1].cos() * (d_lon / 2.0).sin().powi(2);

    // rounding can push h a hair past 1 for antipodal points
    2.0 * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Great-circle distance in meters between two degree points.
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    rad_to_meters(haversine(&a.to_radians(), &b.to_radians()), EARTH_RADIUS_M)
}
