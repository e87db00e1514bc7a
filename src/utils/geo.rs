// src/utils/geo.rs
use crate::models::route::LatLng;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Same distance in meters, for maneuver-proximity checks.
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    haversine_km(a, b) * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = LatLng::new(33.5138, 36.2765);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let damascus = LatLng::new(33.5138, 36.2765);
        let aleppo = LatLng::new(36.2021, 37.1594);
        let forward = haversine_km(damascus, aleppo);
        let backward = haversine_km(aleppo, damascus);
        assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn test_damascus_to_aleppo() {
        // Straight-line distance is roughly 310 km.
        let damascus = LatLng::new(33.5138, 36.2765);
        let aleppo = LatLng::new(36.2021, 37.1594);
        let km = haversine_km(damascus, aleppo);
        assert!(km > 290.0 && km < 330.0, "got {} km", km);
    }

    #[test]
    fn test_meters_scaling() {
        let a = LatLng::new(33.5138, 36.2765);
        let b = LatLng::new(33.5148, 36.2765);
        let km = haversine_km(a, b);
        let m = haversine_m(a, b);
        assert!((m - km * 1000.0).abs() < 1e-9);
        // One thousandth of a degree of latitude is about 111 m.
        assert!(m > 100.0 && m < 125.0, "got {} m", m);
    }
}
