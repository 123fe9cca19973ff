//! Topographic Position Index (TPI)
//!
//!   TPI = z_center - mean(z_neighbours)
//!
//! Positive on ridges and moraine crests, negative in valleys and on the
//! glacier trough floor. Reference: Weiss (2001).

use crate::maybe_rayon::*;
use glacis_core::raster::Raster;
use glacis_core::{Algorithm, Error, Result};

use super::{build_output, neighbourhood};

/// Parameters for TPI calculation
#[derive(Debug, Clone)]
pub struct TpiParams {
    /// Neighbourhood radius in cells (1 → 3x3, 2 → 5x5)
    pub radius: usize,
}

impl Default for TpiParams {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

/// TPI algorithm
#[derive(Debug, Clone, Default)]
pub struct Tpi;

impl Algorithm for Tpi {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = TpiParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TPI"
    }

    fn description(&self) -> &'static str {
        "Topographic Position Index: elevation relative to neighbourhood mean"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        tpi(&input, params)
    }
}

/// Calculate the Topographic Position Index.
///
/// Cells whose window leaves the raster are NaN. Nodata neighbours are
/// skipped.
pub fn tpi(dem: &Raster<f64>, params: TpiParams) -> Result<Raster<f64>> {
    if params.radius == 0 {
        return Err(Error::InvalidParameter {
            name: "radius",
            value: "0".into(),
            reason: "must be at least 1".into(),
        });
    }
    let (rows, cols) = dem.shape();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    neighbourhood(dem, row, col, params.radius)
                        .map_or(f64::NAN, |n| n.center - n.sum / n.count as f64)
                })
                .collect::<Vec<_>>()
        })
        .collect();

    build_output(dem, output_data, f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::tilted_plane;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_is_zero() {
        let result = tpi(&tilted_plane(7, 7, 3.0, 1.0), TpiParams { radius: 2 }).unwrap();
        assert_relative_eq!(result.get(3, 3).unwrap(), 0.0, epsilon = 1e-9);
        assert!(result.get(1, 3).unwrap().is_nan());
    }

    #[test]
    fn test_peak_and_pit() {
        let mut dem = Raster::filled(5, 5, 100.0);
        dem.set(2, 2, 108.0).unwrap();
        let peak = tpi(&dem, TpiParams::default()).unwrap();
        assert_relative_eq!(peak.get(2, 2).unwrap(), 8.0);
        // Neighbour of the peak: its mean includes the peak
        assert_relative_eq!(peak.get(1, 1).unwrap(), -1.0);
    }

    #[test]
    fn test_zero_radius_rejected() {
        assert!(tpi(&Raster::filled(3, 3, 1.0), TpiParams { radius: 0 }).is_err());
    }
}
