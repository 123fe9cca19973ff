//! Imagery feature derivation
//!
//! - Normalized difference indices: NDVI, NDSI
//! - Calibration: scale/offset of integer products, linear power to dB
//! - Change detection: temporal differences and polarization differences

mod calibration;
mod change_detection;
mod indices;

pub use calibration::{
    landsat_surface_temperature, landsat_surface_reflectance, linear_to_db, scale_offset,
    sentinel2_reflectance,
};
pub use change_detection::{polarization_difference, raster_difference};
pub use indices::{ndsi, ndvi, normalized_difference};

use glacis_core::raster::Raster;
use glacis_core::{Error, Result};
use ndarray::Array2;

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

/// Wrap row-major kernel output in a raster with `template`'s georeferencing
fn build_output(template: &Raster<f64>, data: Vec<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = template.shape();
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Value at a cell, or NaN when it is nodata
#[inline]
fn masked(r: &Raster<f64>, row: usize, col: usize) -> f64 {
    let v = unsafe { r.get_unchecked(row, col) };
    if r.is_nodata(v) {
        f64::NAN
    } else {
        v
    }
}
