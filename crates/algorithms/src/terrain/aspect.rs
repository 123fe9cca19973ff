//! Aspect from DEMs
//!
//! Direction of steepest descent from Horn (1981) gradients.

use crate::maybe_rayon::*;
use glacis_core::raster::Raster;
use glacis_core::{Algorithm, Error, Result};
use std::f64::consts::TAU;

use super::{build_output, cell_spacing, horn_gradient, window3, GridUnits};

/// Value assigned to flat cells, raster edges and cells next to nodata
pub const FLAT_ASPECT: f64 = -1.0;

const FLAT_THRESHOLD: f64 = 1e-10;

/// Output format for aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectOutput {
    /// Degrees (0-360, 0 = north, clockwise)
    #[default]
    Degrees,
    /// Radians (0-2π)
    Radians,
}

/// Parameters for aspect calculation
#[derive(Debug, Clone, Copy, Default)]
pub struct AspectParams {
    pub output: AspectOutput,
    pub grid: GridUnits,
}

/// Aspect algorithm
#[derive(Debug, Clone, Default)]
pub struct Aspect;

impl Algorithm for Aspect {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = AspectParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Aspect"
    }

    fn description(&self) -> &'static str {
        "Direction of steepest descent of a DEM, clockwise from north"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        aspect(&input, params)
    }
}

/// Calculate aspect from a DEM
///
/// 0° = north, 90° = east, 180° = south, 270° = west. Flat cells, edges and
/// cells with a nodata neighbour get [`FLAT_ASPECT`], which is also the
/// output nodata value.
///
/// On a [`GridUnits::Geographic`] grid the two gradient components are
/// scaled by their own metric spacing, so bearings are true bearings.
pub fn aspect(dem: &Raster<f64>, params: AspectParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![FLAT_ASPECT; cols];
            // Only the dx:dy ratio matters for the direction
            let (dx, dy) = cell_spacing(dem, row, 1.0, params.grid);
            for (col, out) in row_data.iter_mut().enumerate() {
                let Some(w) = window3(dem, row, col) else {
                    continue;
                };
                let (dz_dx, dz_dy) = horn_gradient(&w, dx, dy);
                if dz_dx.abs() < FLAT_THRESHOLD && dz_dy.abs() < FLAT_THRESHOLD {
                    continue;
                }

                // Descent points along (-dz_dx) east and (+dz_dy) north, since
                // rows grow southward.
                let mut bearing = (-dz_dx).atan2(dz_dy);
                if bearing < 0.0 {
                    bearing += TAU;
                }

                *out = match params.output {
                    AspectOutput::Degrees => bearing.to_degrees(),
                    AspectOutput::Radians => bearing,
                };
            }
            row_data
        })
        .collect();

    build_output(dem, output_data, FLAT_ASPECT)
}
