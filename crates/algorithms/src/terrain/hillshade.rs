//! Hillshade (shaded relief)

use crate::maybe_rayon::*;
use glacis_core::raster::Raster;
use glacis_core::{Algorithm, Error, Result};
use std::f64::consts::TAU;

use super::{build_output, cell_spacing, horn_gradient, window3, GridUnits};

/// Parameters for hillshade calculation
#[derive(Debug, Clone)]
pub struct HillshadeParams {
    /// Sun azimuth in degrees (0 = north, clockwise)
    pub azimuth: f64,
    /// Sun altitude in degrees above the horizon
    pub altitude: f64,
    /// Horizontal units per map unit, as for slope
    pub z_factor: f64,
    pub grid: GridUnits,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self {
            azimuth: 315.0,
            altitude: 45.0,
            z_factor: 1.0,
            grid: GridUnits::Projected,
        }
    }
}

/// Hillshade algorithm
#[derive(Debug, Clone, Default)]
pub struct Hillshade;

impl Algorithm for Hillshade {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = HillshadeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Hillshade"
    }

    fn description(&self) -> &'static str {
        "Shaded relief of a DEM under a point light source"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        hillshade(&input, params)
    }
}

/// Calculate hillshade from a DEM
///
/// `shade = cos(zenith)·cos(slope) + sin(zenith)·sin(slope)·cos(azimuth − aspect)`
///
/// scaled to 0-255. Edge cells and cells with a nodata neighbour are NaN.
pub fn hillshade(dem: &Raster<f64>, params: HillshadeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();

    // Math-convention azimuth (counter-clockwise from east)
    let azimuth_rad = (360.0 - params.azimuth + 90.0).to_radians();
    let zenith_rad = (90.0 - params.altitude).to_radians();
    let (sin_zenith, cos_zenith) = zenith_rad.sin_cos();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let (dx, dy) = cell_spacing(dem, row, params.z_factor, params.grid);
            for (col, out) in row_data.iter_mut().enumerate() {
                let Some(w) = window3(dem, row, col) else {
                    continue;
                };
                let (dz_dx, dz_dy) = horn_gradient(&w, dx, dy);
                let slope_rad = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();

                let aspect_rad = if dz_dx.abs() < 1e-10 && dz_dy.abs() < 1e-10 {
                    0.0
                } else {
                    // Descent direction in math convention: east = -dz_dx,
                    // north = +dz_dy (rows grow southward)
                    let a = dz_dy.atan2(-dz_dx);
                    if a < 0.0 {
                        a + TAU
                    } else {
                        a
                    }
                };

                let shade = cos_zenith * slope_rad.cos()
                    + sin_zenith * slope_rad.sin() * (azimuth_rad - aspect_rad).cos();
                *out = (shade.clamp(0.0, 1.0) * 255.0).round();
            }
            row_data
        })
        .collect();

    build_output(dem, output_data, f64::NAN)
}
