//! Coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, as used by the backend's distance calculation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `true` when both components are finite and inside the valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_m(self, other)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// Haversine distance between two coordinates in meters.
#[must_use]
pub fn haversine_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Returns the coordinate `meters` due north of `origin`.
///
/// Handy for building fixtures at a known distance.
#[must_use]
pub fn offset_north(origin: &Coordinate, meters: f64) -> Coordinate {
    let d_lat = (meters / EARTH_RADIUS_M).to_degrees();
    Coordinate::new(origin.lat + d_lat, origin.lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SF: Coordinate = Coordinate::new(37.7749, -122.4194);

    #[test]
    fn distance_to_self_is_zero() {
        assert!(haversine_m(&SF, &SF).abs() < 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let other = Coordinate::new(37.8044, -122.2712);
        let ab = haversine_m(&SF, &other);
        let ba = haversine_m(&other, &SF);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn sf_to_oakland_is_about_13_km() {
        let oakland = Coordinate::new(37.8044, -122.2712);
        let d = SF.distance_to(&oakland);
        assert!((12_500.0..14_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn offset_north_lands_at_requested_distance() {
        for meters in [10.0, 80.0, 150.0, 1_000.0] {
            let moved = offset_north(&SF, meters);
            let d = haversine_m(&SF, &moved);
            assert!((d - meters).abs() < 0.01, "wanted {meters}, got {d}");
        }
    }

    #[test]
    fn is_valid_rejects_out_of_range_and_nan() {
        assert!(SF.is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn display_uses_six_decimals() {
        assert_eq!(SF.to_string(), "37.774900,-122.419400");
    }
}
