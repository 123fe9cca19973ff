//! Features derived from slope and aspect rasters

use crate::maybe_rayon::*;
use glacis_core::raster::Raster;
use glacis_core::Result;

use super::{aspect::FLAT_ASPECT, build_output};

/// Lower bounds (degrees) of the ordinal slope classes 1..=5
pub const SLOPE_CLASS_EDGES: [f64; 5] = [0.0, 5.0, 15.0, 30.0, 45.0];

/// Reclassify slope degrees into ordinal classes.
///
/// `[0,5) → 1`, `[5,15) → 2`, `[15,30) → 3`, `[30,45) → 4`, `≥45 → 5`.
/// NaN stays NaN.
pub fn slope_classes(slope_deg: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = slope_deg.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let s = unsafe { slope_deg.get_unchecked(row, col) };
                    if slope_deg.is_nodata(s) {
                        return f64::NAN;
                    }
                    let class = SLOPE_CLASS_EDGES.iter().filter(|&&edge| s >= edge).count();
                    class.max(1) as f64
                })
                .collect::<Vec<_>>()
        })
        .collect();
    build_output(slope_deg, data, f64::NAN)
}

/// Sine (eastness) and cosine (northness) of an aspect raster in degrees.
///
/// Aspect is circular, so 359° and 1° should be neighbours in feature space.
/// Flat cells ([`FLAT_ASPECT`]) and nodata have no direction and are NaN.
pub fn aspect_components(aspect_deg: &Raster<f64>) -> Result<(Raster<f64>, Raster<f64>)> {
    let (rows, cols) = aspect_deg.shape();
    let (sin_data, cos_data): (Vec<f64>, Vec<f64>) = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let a = unsafe { aspect_deg.get_unchecked(row, col) };
                    if a == FLAT_ASPECT || aspect_deg.is_nodata(a) {
                        (f64::NAN, f64::NAN)
                    } else {
                        a.to_radians().sin_cos()
                    }
                })
                .collect::<Vec<_>>()
        })
        .unzip();

    Ok((
        build_output(aspect_deg, sin_data, f64::NAN)?,
        build_output(aspect_deg, cos_data, f64::NAN)?,
    ))
}
