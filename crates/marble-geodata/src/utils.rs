//! Utility functions for projection math and spherical geometry

use crate::Coordinates;

/// Mean equatorial radius used for distances, in meters
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the Mercator tile projection, in radians (≈ 85.0511°)
pub const MERCATOR_MAX_LATITUDE_RAD: f64 = 1.484_422_229_745_332_4;

/// Inverse Gudermannian function: maps a latitude (radians) to the Mercator y ordinate
#[inline(always)]
pub fn gd_inv(lat: f64) -> f64 {
    lat.tan().asinh()
}

/// Gudermannian function: maps a Mercator y ordinate back to a latitude (radians)
#[inline(always)]
pub fn gd(y: f64) -> f64 {
    y.sinh().atan()
}

/// Wrap a longitude in degrees into `[-180, 180)`
#[inline(always)]
pub fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 { 180.0 } else { wrapped }
}

/// Great-circle distance between two coordinates on a sphere of the given radius
#[inline(always)]
pub fn haversine_distance(a: &Coordinates, b: &Coordinates, radius: f64) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * radius * h.sqrt().asin()
}

/// Convert a GPX waypoint to coordinates, keeping the elevation when present
#[inline(always)]
pub fn waypoint_to_coordinates(waypoint: &gpx::Waypoint) -> Coordinates {
    let point = waypoint.point();
    Coordinates::new(point.x(), point.y(), waypoint.elevation.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gd_roundtrip() {
        for lat in [-1.2, -0.5, 0.0, 0.3, 1.1] {
            assert!((gd(gd_inv(lat)) - lat).abs() < 1e-12);
        }
    }

    #[test]
    fn test_mercator_limit_maps_to_pi() {
        // The square Mercator world ends where y == PI.
        assert!((gd_inv(MERCATOR_MAX_LATITUDE_RAD) - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_lon() {
        assert_eq!(normalize_lon(190.0), -170.0);
        assert_eq!(normalize_lon(-190.0), 170.0);
        assert_eq!(normalize_lon(45.0), 45.0);
        assert_eq!(normalize_lon(180.0), 180.0);
    }

    #[test]
    fn test_haversine_quarter_meridian() {
        let a = Coordinates::new(0.0, 0.0, 0.0);
        let b = Coordinates::new(0.0, 90.0, 0.0);
        let expected = std::f64::consts::FRAC_PI_2 * EARTH_RADIUS;
        assert!((haversine_distance(&a, &b, EARTH_RADIUS) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_waypoint_to_coordinates() {
        let mut waypoint = gpx::Waypoint::new(geo::Point::new(7.5, 46.2));
        waypoint.elevation = Some(1200.0);
        let c = waypoint_to_coordinates(&waypoint);
        assert_eq!((c.lon, c.lat, c.alt), (7.5, 46.2, 1200.0));
    }
}
