//! Change detection between co-registered rasters

use crate::maybe_rayon::*;
use glacis_core::raster::Raster;
use glacis_core::Result;

use super::{build_output, check_dimensions, masked};

/// Per-pixel difference `after - before`.
///
/// Used for elevation change between two DEM epochs, backscatter change
/// between seasons, and index change between years. NaN or nodata in either
/// input gives NaN.
pub fn raster_difference(before: &Raster<f64>, after: &Raster<f64>) -> Result<Raster<f64>> {
    subtract(after, before)
}

/// Co-polarized minus cross-polarized backscatter, `VV - VH`, both in dB.
pub fn polarization_difference(vv: &Raster<f64>, vh: &Raster<f64>) -> Result<Raster<f64>> {
    subtract(vv, vh)
}

fn subtract(a: &Raster<f64>, b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(a, b)?;
    let (rows, cols) = a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                row_data.push(masked(a, row, col) - masked(b, row, col));
            }
            row_data
        })
        .collect();

    build_output(a, data)
}
