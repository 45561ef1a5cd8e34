//! Great-circle distance between coordinates.

use lifeline_types::Coordinates;

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between `a` and `b` in kilometres.
///
/// Only used to rank candidate units, so the spherical-Earth error is
/// irrelevant as long as the ordering is preserved.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Point at fraction `t` (0.0 to 1.0) of the straight segment `from -> to`.
///
/// Linear in degrees, which is accurate enough at city scale.
pub fn lerp(from: Coordinates, to: Coordinates, t: f64) -> Coordinates {
    Coordinates::new(
        (to.lat - from.lat).mul_add(t, from.lat),
        (to.lng - from.lng).mul_add(t, from.lng),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_to_self() {
        let p = Coordinates::new(40.0, -79.0);
        assert!(distance_km(p, p).abs() < 1e-12);
    }

    #[test]
    fn one_hundredth_degree_of_latitude() {
        // 0.01 degrees of latitude is about 1.112 km everywhere.
        let d = distance_km(Coordinates::new(40.0, -79.0), Coordinates::new(40.01, -79.0));
        assert!((d - 1.112).abs() < 0.01, "got {d}");
    }

    #[test]
    fn known_city_pair() {
        // New York -> Los Angeles is roughly 3936 km on a sphere.
        let nyc = Coordinates::new(40.7128, -74.0060);
        let la = Coordinates::new(34.0522, -118.2437);
        let d = distance_km(nyc, la);
        assert!((d - 3936.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn symmetric() {
        let a = Coordinates::new(51.5, -0.12);
        let b = Coordinates::new(48.85, 2.35);
        assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Coordinates::new(10.0, 20.0);
        let b = Coordinates::new(12.0, 24.0);
        let mid = lerp(a, b, 0.5);
        assert!((mid.lat - 11.0).abs() < 1e-12);
        assert!((mid.lng - 22.0).abs() < 1e-12);
        let end = lerp(a, b, 1.0);
        assert!((end.lat - b.lat).abs() < 1e-12);
    }
}
