//! Terrain analysis on Digital Elevation Models
//!
//! - Slope, aspect and hillshade from Horn (1981) 3x3 gradients, on
//!   projected grids or on geographic (degree) grids
//! - TPI and TRI over a square neighbourhood of configurable radius
//! - Derived features: ordinal slope classes, aspect sine/cosine

mod aspect;
mod derived;
mod hillshade;
mod slope;
mod tpi;
mod tri;

pub use aspect::{aspect, Aspect, AspectOutput, AspectParams, FLAT_ASPECT};
pub use derived::{aspect_components, slope_classes, SLOPE_CLASS_EDGES};
pub use hillshade::{hillshade, Hillshade, HillshadeParams};
pub use slope::{slope, Slope, SlopeParams, SlopeUnits};
pub use tpi::{tpi, Tpi, TpiParams};
pub use tri::{tri, Tri, TriParams};

use glacis_core::raster::Raster;
use glacis_core::region::METERS_PER_DEGREE;
use glacis_core::{Error, Result};
use ndarray::Array2;

/// Horizontal units of a DEM grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridUnits {
    /// Cell size in map units, scaled by `z_factor` into elevation units
    #[default]
    Projected,
    /// Cell size in degrees with elevations in metres. North-south spacing
    /// is `R·Δφ`, east-west spacing `R·cos φ·Δλ` at the latitude of each row.
    Geographic,
}

/// Metric cell spacing `(dx, dy)` along the row `row`
fn cell_spacing(dem: &Raster<f64>, row: usize, z_factor: f64, grid: GridUnits) -> (f64, f64) {
    let t = dem.transform();
    let (width, height) = (t.pixel_width.abs(), t.pixel_height.abs());
    match grid {
        GridUnits::Projected => (width * z_factor, height * z_factor),
        GridUnits::Geographic => {
            let (_, lat) = t.pixel_to_geo(0, row);
            let dy = height * METERS_PER_DEGREE;
            let dx = width * METERS_PER_DEGREE * lat.to_radians().cos();
            (dx * z_factor, dy * z_factor)
        }
    }
}

/// The 3x3 window around `(row, col)` in row-major order:
///
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// `None` on the raster edge or when any cell is NaN or nodata.
#[inline]
fn window3(dem: &Raster<f64>, row: usize, col: usize) -> Option<[f64; 9]> {
    let (rows, cols) = dem.shape();
    if row == 0 || col == 0 || row + 1 >= rows || col + 1 >= cols {
        return None;
    }
    let mut w = [0.0; 9];
    for (k, v) in w.iter_mut().enumerate() {
        let (dr, dc) = (k / 3, k % 3);
        let z = unsafe { dem.get_unchecked(row + dr - 1, col + dc - 1) };
        if dem.is_nodata(z) {
            return None;
        }
        *v = z;
    }
    Some(w)
}

/// Horn gradients `(dz/dx, dz/dy)` in elevation units per horizontal unit,
/// for cells `dx` wide and `dy` tall.
///
/// `dz/dy` increases with row index, i.e. southward on a north-up grid.
#[inline]
fn horn_gradient(w: &[f64; 9], dx: f64, dy: f64) -> (f64, f64) {
    let [a, b, c, d, _, f, g, h, i] = *w;
    let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / (8.0 * dx);
    let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / (8.0 * dy);
    (dz_dx, dz_dy)
}

fn build_output(dem: &Raster<f64>, data: Vec<f64>, nodata: f64) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(nodata));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
pub(crate) fn tilted_plane(rows: usize, cols: usize, dz_per_row: f64, dz_per_col: f64) -> Raster<f64> {
    let mut dem = Raster::new(rows, cols);
    dem.set_transform(glacis_core::GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
    for row in 0..rows {
        for col in 0..cols {
            dem.set(row, col, 1000.0 + row as f64 * dz_per_row + col as f64 * dz_per_col)
                .unwrap();
        }
    }
    dem
}

/// Plane on a 0.001° grid around 30.92°N rising `east` metres per metre
/// eastward and `north` metres per metre northward, evaluated in the local
/// metric of row `rows / 2`.
#[cfg(test)]
pub(crate) fn degree_plane(rows: usize, cols: usize, east: f64, north: f64) -> Raster<f64> {
    let step = 0.001;
    let mut dem = Raster::new(rows, cols);
    dem.set_transform(glacis_core::GeoTransform::new(78.9, 30.92 + step * rows as f64 / 2.0, step, -step));
    let (lon0, lat0) = dem.transform().pixel_to_geo(0, rows / 2);
    let cos0 = lat0.to_radians().cos();
    for row in 0..rows {
        for col in 0..cols {
            let (lon, lat) = dem.transform().pixel_to_geo(col, row);
            let east_m = (lon - lon0) * METERS_PER_DEGREE * cos0;
            let north_m = (lat - lat0) * METERS_PER_DEGREE;
            dem.set(row, col, 4000.0 + east * east_m + north * north_m).unwrap();
        }
    }
    dem
}

/// Summary of the valid cells in the square window of `radius`
/// around a centre cell (the centre itself excluded).
#[derive(Debug, Clone, Copy)]
struct Neighbourhood {
    center: f64,
    count: usize,
    sum: f64,
    /// Σ (z_neighbour − z_center)²
    sum_sq_dev: f64,
}

/// `None` when the centre is nodata or the window leaves the raster.
fn neighbourhood(dem: &Raster<f64>, row: usize, col: usize, radius: usize) -> Option<Neighbourhood> {
    let (rows, cols) = dem.shape();
    if radius == 0 || row < radius || col < radius || row + radius >= rows || col + radius >= cols {
        return None;
    }
    let center = unsafe { dem.get_unchecked(row, col) };
    if dem.is_nodata(center) {
        return None;
    }

    let mut stats = Neighbourhood {
        center,
        count: 0,
        sum: 0.0,
        sum_sq_dev: 0.0,
    };
    for nr in row - radius..=row + radius {
        for nc in col - radius..=col + radius {
            if nr == row && nc == col {
                continue;
            }
            let z = unsafe { dem.get_unchecked(nr, nc) };
            if dem.is_nodata(z) {
                continue;
            }
            stats.count += 1;
            stats.sum += z;
            stats.sum_sq_dev += (z - center) * (z - center);
        }
    }
    (stats.count > 0).then_some(stats)
}
