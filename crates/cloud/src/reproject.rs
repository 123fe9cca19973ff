//! WGS84 to UTM projection and nearest-neighbour warping onto
//! geographic grids.
//!
//! Covers EPSG 326xx (UTM North) and 327xx (UTM South), which is what
//! Sentinel-2, Landsat and Sentinel-1 RTC assets are delivered in.

use glacis_core::region::METERS_PER_DEGREE;
use glacis_core::{GeoTransform, Raster};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Coordinate reference systems an asset may be delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    Wgs84,
    Utm { zone: u32, north: bool },
}

impl Crs {
    /// `None` for codes other than 4326 and the UTM zones
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        if epsg == 4326 {
            return Some(Self::Wgs84);
        }
        parse_utm_epsg(epsg).map(|(zone, north)| Self::Utm { zone, north })
    }

    /// Project a WGS84 point into this CRS.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        match *self {
            Self::Wgs84 => (lon, lat),
            Self::Utm { zone, north } => wgs84_to_utm(lon, lat, zone, north),
        }
    }

    /// Envelope of a `(west, south, east, north)` degree bbox in this CRS.
    ///
    /// All four corners and edge midpoints are projected, since UTM
    /// bends parallels.
    pub fn project_bbox(&self, bbox: (f64, f64, f64, f64)) -> (f64, f64, f64, f64) {
        let (w, s, e, n) = bbox;
        let (mx, my) = ((w + e) / 2.0, (s + n) / 2.0);
        let points = [(w, s), (w, n), (e, s), (e, n), (mx, s), (mx, n), (w, my), (e, my)];

        let mut out = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(lon, lat) in &points {
            let (x, y) = self.project(lon, lat);
            out.0 = out.0.min(x);
            out.1 = out.1.min(y);
            out.2 = out.2.max(x);
            out.3 = out.3.max(y);
        }
        out
    }
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
///
/// - EPSG 326xx → zone xx, North hemisphere
/// - EPSG 327xx → zone xx, South hemisphere
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

/// North-up WGS84 grid with square cells of roughly `resolution_m` covering
/// a degree bbox.
pub fn geographic_grid(bbox: (f64, f64, f64, f64), resolution_m: f64) -> (GeoTransform, usize, usize) {
    let (w, s, e, n) = bbox;
    let step = resolution_m / METERS_PER_DEGREE;
    let cols = ((e - w) / step).ceil().max(1.0) as usize;
    let rows = ((n - s) / step).ceil().max(1.0) as usize;
    (GeoTransform::new(w, n, step, -step), rows, cols)
}

/// Resample `src` (in `src_crs`) onto a WGS84 grid, nearest neighbour.
///
/// Target cells whose centre falls outside `src` or on its nodata are NaN.
pub fn warp_to_grid(
    src: &Raster<f64>,
    src_crs: Crs,
    target: &GeoTransform,
    rows: usize,
    cols: usize,
) -> Raster<f64> {
    if src_crs == Crs::Wgs84 {
        return src.resample_to(target, rows, cols);
    }
    let mut out = Raster::filled(rows, cols, f64::NAN);
    out.set_transform(*target);
    out.set_nodata(Some(f64::NAN));
    for ((row, col), cell) in out.data_mut().indexed_iter_mut() {
        let (lon, lat) = target.pixel_to_geo(col, row);
        let (x, y) = src_crs.project(lon, lat);
        if let Some(v) = src.value_at(x, y) {
            if !src.is_nodata(v) {
                *cell = v;
            }
        }
    }
    out
}

// ── Core projection (Snyder 1987, USGS Prof. Paper 1395, pp. 61-64) ─────

/// Convert WGS84 (longitude, latitude) in degrees to UTM (easting, northing)
/// in metres for the given zone and hemisphere.
pub fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();

    // Central meridian of the zone
    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);

    // Meridional arc length M (Snyder eq. 3-21)
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Easting (Snyder eq. 8-9)
    let easting = K0 * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2)
                * a4
                * a_coeff
                / 120.0)
        + FALSE_EASTING;

    // Northing (Snyder eq. 8-10)
    let northing = K0
        * (m
            + n
                * tan_lat
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

/// Meridional arc from equator to latitude `lat` (radians).
/// Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e2 = E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

// ── Tests ────────────────────────────────────────────────────────────────
