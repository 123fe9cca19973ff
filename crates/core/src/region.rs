//! Circular study region in WGS84 coordinates

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances (m)
const EARTH_RADIUS_M: f64 = 6_371_008.8;
/// Metres per degree of latitude (and of longitude at the equator)
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Region of interest: a centre point buffered by a radius.
///
/// Static configuration, never mutated during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Human-readable name, used in reports
    pub name: String,
    /// Centre longitude (degrees east)
    pub lon: f64,
    /// Centre latitude (degrees north)
    pub lat: f64,
    /// Buffer radius in metres
    pub radius_m: f64,
}

impl Region {
    pub fn new(name: impl Into<String>, lon: f64, lat: f64, radius_m: f64) -> Self {
        Self {
            name: name.into(),
            lon,
            lat,
            radius_m,
        }
    }

    /// Gangotri glacier, 15 km buffer around 30.92°N 79.08°E
    pub fn gangotri() -> Self {
        Self::new("Gangotri", 79.08, 30.92, 15_000.0)
    }

    /// Bounding box `(west, south, east, north)` in degrees
    pub fn bbox(&self) -> (f64, f64, f64, f64) {
        let dlat = self.radius_m / METERS_PER_DEGREE;
        let dlon = self.radius_m / (METERS_PER_DEGREE * self.lat.to_radians().cos().max(1e-6));
        (self.lon - dlon, self.lat - dlat, self.lon + dlon, self.lat + dlat)
    }

    /// Whether (lon, lat) lies within the buffer
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        haversine_m(self.lon, self.lat, lon, lat) <= self.radius_m
    }
}

/// Great-circle distance between two WGS84 points in metres
pub fn haversine_m(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = p2 - p1;
    let dl = (lon2 - lon1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bbox_encloses_buffer() {
        let r = Region::gangotri();
        let (w, s, e, n) = r.bbox();
        assert!(w < r.lon && e > r.lon && s < r.lat && n > r.lat);
        // Edge midpoints are roughly radius away
        assert_relative_eq!(haversine_m(r.lon, r.lat, r.lon, n), 15_000.0, max_relative = 0.01);
        assert_relative_eq!(haversine_m(r.lon, r.lat, e, r.lat), 15_000.0, max_relative = 0.01);
    }

    #[test]
    fn contains_is_circular() {
        let r = Region::gangotri();
        let (w, s, _, _) = r.bbox();
        assert!(r.contains(r.lon, r.lat));
        assert!(r.contains(r.lon + 0.05, r.lat));
        // The bbox corner is outside the circle
        assert!(!r.contains(w, s));
    }
}
