//! Slope from DEMs
//!
//! Horn (1981) method over a 3x3 neighbourhood.

use crate::maybe_rayon::*;
use glacis_core::raster::Raster;
use glacis_core::{Algorithm, Error, Result};

use super::{build_output, cell_spacing, horn_gradient, window3, GridUnits};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Degrees (0-90)
    #[default]
    Degrees,
    /// Percent rise
    Percent,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    pub units: SlopeUnits,
    /// Horizontal units per map unit on projected grids
    pub z_factor: f64,
    pub grid: GridUnits,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            z_factor: 1.0,
            grid: GridUnits::Projected,
        }
    }
}

/// Slope algorithm
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Slope of a DEM using Horn's method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope(&input, params)
    }
}

/// Calculate slope from a DEM
///
/// `slope = atan(sqrt(dz/dx² + dz/dy²))`
///
/// Edge cells and cells with a nodata neighbour are NaN.
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();

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
                let rise = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();
                *out = match params.units {
                    SlopeUnits::Degrees => rise.atan().to_degrees(),
                    SlopeUnits::Percent => rise * 100.0,
                };
            }
            row_data
        })
        .collect();

    build_output(dem, output_data, f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{degree_plane, tilted_plane};
    use approx::assert_relative_eq;

    #[test]
    fn test_slope_flat() {
        let dem = Raster::filled(6, 6, 4000.0);
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert!(result.get(3, 3).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_slope_45_degrees() {
        // 1 m rise per 1 m cell
        let dem = tilted_plane(8, 8, 0.0, 1.0);
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert_relative_eq!(result.get(4, 4).unwrap(), 45.0, epsilon = 1e-9);

        let pct = slope(&dem, SlopeParams { units: SlopeUnits::Percent, ..Default::default() }).unwrap();
        assert_relative_eq!(pct.get(4, 4).unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_z_factor_flattens() {
        let dem = tilted_plane(8, 8, 0.0, 1.0);
        let result = slope(&dem, SlopeParams { z_factor: 1000.0, ..Default::default() }).unwrap();
        assert!(result.get(4, 4).unwrap() < 0.1);
    }

    #[test]
    fn test_degree_grid_uses_metric_spacing_per_axis() {
        let dem = degree_plane(9, 9, 0.1, 0.1);
        let params = SlopeParams { grid: GridUnits::Geographic, ..Default::default() };
        let result = slope(&dem, params.clone()).unwrap();
        let expected = (0.02f64).sqrt().atan().to_degrees();
        assert_relative_eq!(result.get(4, 4).unwrap(), expected, epsilon = 1e-6);

        // Equal metric gradients give equal slope along either axis
        let ns = slope(&degree_plane(9, 9, 0.0, 0.2), params.clone()).unwrap();
        let ew = slope(&degree_plane(9, 9, 0.2, 0.0), params).unwrap();
        assert_relative_eq!(ns.get(4, 4).unwrap(), ew.get(4, 4).unwrap(), epsilon = 1e-6);
    }

    #[test]
    fn test_edges_and_nodata_are_nan() {
        let mut dem = tilted_plane(6, 6, 2.0, 1.0);
        dem.set(3, 3, f64::NAN).unwrap();
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert!(result.get(0, 2).unwrap().is_nan());
        assert!(result.get(5, 5).unwrap().is_nan());
        assert!(result.get(2, 2).unwrap().is_nan());
        assert!(result.get(1, 1).unwrap().is_finite());
    }
}
