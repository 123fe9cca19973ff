//! Radiometric calibration of provider products
//!
//! Provider archives store integer digital numbers. These functions turn them
//! into physical units before any index is computed.

use crate::maybe_rayon::*;
use glacis_core::raster::Raster;
use glacis_core::Result;

use super::{build_output, masked};

/// Sentinel-2 L2A reflectance quantification value
pub const SENTINEL2_SCALE: f64 = 0.0001;
/// Landsat Collection 2 Level-2 surface reflectance
pub const LANDSAT_SR_SCALE: f64 = 0.000_027_5;
pub const LANDSAT_SR_OFFSET: f64 = -0.2;
/// Landsat Collection 2 Level-2 surface temperature (Kelvin)
pub const LANDSAT_ST_SCALE: f64 = 0.003_418_02;
pub const LANDSAT_ST_OFFSET: f64 = 149.0;
const KELVIN_TO_CELSIUS: f64 = -273.15;

/// `value * scale + offset` for every valid pixel; nodata becomes NaN.
pub fn scale_offset(raster: &Raster<f64>, scale: f64, offset: f64) -> Result<Raster<f64>> {
    map_pixels(raster, |v| v * scale + offset)
}

/// Sentinel-2 L2A digital numbers to surface reflectance
pub fn sentinel2_reflectance(raster: &Raster<f64>) -> Result<Raster<f64>> {
    scale_offset(raster, SENTINEL2_SCALE, 0.0)
}

/// Landsat C2L2 SR_B* digital numbers to surface reflectance
pub fn landsat_surface_reflectance(raster: &Raster<f64>) -> Result<Raster<f64>> {
    scale_offset(raster, LANDSAT_SR_SCALE, LANDSAT_SR_OFFSET)
}

/// Landsat C2L2 ST_B10 digital numbers to land surface temperature in °C
pub fn landsat_surface_temperature(raster: &Raster<f64>) -> Result<Raster<f64>> {
    scale_offset(raster, LANDSAT_ST_SCALE, LANDSAT_ST_OFFSET + KELVIN_TO_CELSIUS)
}

/// Linear backscatter power to decibels, `10 * log10(v)`.
///
/// Non-positive values have no logarithm and become NaN.
pub fn linear_to_db(raster: &Raster<f64>) -> Result<Raster<f64>> {
    map_pixels(raster, |v| if v > 0.0 { 10.0 * v.log10() } else { f64::NAN })
}

fn map_pixels<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let (rows, cols) = raster.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let v = masked(raster, row, col);
                    if v.is_nan() {
                        f64::NAN
                    } else {
                        f(v)
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();
    build_output(raster, data)
}
