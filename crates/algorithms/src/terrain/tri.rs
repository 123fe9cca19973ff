//! Terrain Ruggedness Index (TRI)
//!
//! Riley et al. (1999):
//!
//!   TRI = sqrt( Σ (z_neighbour - z_center)² / n )
//!
//! Low over the smooth glacier tongue, high on headwalls and lateral moraines.

use crate::maybe_rayon::*;
use glacis_core::raster::Raster;
use glacis_core::{Algorithm, Error, Result};

use super::{build_output, neighbourhood};

/// Parameters for TRI calculation
#[derive(Debug, Clone)]
pub struct TriParams {
    /// Neighbourhood radius in cells (1 → 3x3)
    pub radius: usize,
}

impl Default for TriParams {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

/// TRI algorithm
#[derive(Debug, Clone, Default)]
pub struct Tri;

impl Algorithm for Tri {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = TriParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TRI"
    }

    fn description(&self) -> &'static str {
        "Terrain Ruggedness Index: RMS elevation difference to the neighbourhood"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        tri(&input, params)
    }
}

/// Calculate the Terrain Ruggedness Index, in elevation units.
pub fn tri(dem: &Raster<f64>, params: TriParams) -> Result<Raster<f64>> {
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
                        .map_or(f64::NAN, |n| (n.sum_sq_dev / n.count as f64).sqrt())
                })
                .collect::<Vec<_>>()
        })
        .collect();

    build_output(dem, output_data, f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_is_zero() {
        let result = tri(&Raster::filled(6, 6, 5000.0), TriParams::default()).unwrap();
        assert_eq!(result.get(3, 3).unwrap(), 0.0);
        assert!(result.get(0, 3).unwrap().is_nan());
    }

    #[test]
    fn test_single_spike() {
        let mut dem = Raster::filled(5, 5, 0.0);
        dem.set(2, 2, 8.0).unwrap();
        let result = tri(&dem, TriParams::default()).unwrap();
        // Centre: all 8 neighbours differ by 8
        assert_relative_eq!(result.get(2, 2).unwrap(), 8.0);
        // Corner neighbour: one of 8 neighbours differs by 8 -> sqrt(64/8)
        assert_relative_eq!(result.get(1, 1).unwrap(), 8.0_f64.sqrt());
    }

    #[test]
    fn test_nodata_neighbours_skipped() {
        let mut dem = Raster::filled(5, 5, 10.0);
        dem.set(1, 2, f64::NAN).unwrap();
        let result = tri(&dem, TriParams::default()).unwrap();
        assert_eq!(result.get(2, 2).unwrap(), 0.0);
        assert!(result.get(1, 2).unwrap().is_nan());
    }
}
