//! Normalized difference spectral indices
//!
//! All indices operate on single-band rasters of calibrated reflectance.

use crate::maybe_rayon::*;
use glacis_core::raster::Raster;
use glacis_core::Result;

use super::{build_output, check_dimensions, masked};

/// Sums smaller than this are treated as a zero denominator
const ZERO_DENOMINATOR: f64 = 1e-10;

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative inputs. Pixels where the
/// sum is zero or either input is nodata are NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let a = masked(band_a, row, col);
                let b = masked(band_b, row, col);
                if a.is_nan() || b.is_nan() {
                    continue;
                }
                let sum = a + b;
                if sum.abs() < ZERO_DENOMINATOR {
                    continue;
                }
                *out = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, data)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Sentinel-2: B8, B4. Landsat 8: SR_B5, SR_B4.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized Difference Snow Index
///
/// `NDSI = (Green - SWIR) / (Green + SWIR)`
///
/// Snow and ice are bright in green and dark in SWIR, so values above ~0.4
/// usually indicate snow cover. Sentinel-2: B3, B11. Landsat 8: SR_B3, SR_B6.
pub fn ndsi(green: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, swir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glacis_core::{Error, GeoTransform};

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_ndvi_vegetation() {
        let result = ndvi(&make_band(4, 4, 0.5), &make_band(4, 4, 0.1)).unwrap();
        assert_relative_eq!(result.get(2, 2).unwrap(), 0.4 / 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_ndsi_snow_is_positive() {
        let result = ndsi(&make_band(3, 3, 0.8), &make_band(3, 3, 0.1)).unwrap();
        assert!(result.get(1, 1).unwrap() > 0.7);
    }

    #[test]
    fn test_zero_denominator_is_nan() {
        let mut a = make_band(3, 3, 0.3);
        let mut b = make_band(3, 3, 0.1);
        a.set(0, 0, 0.0).unwrap();
        b.set(0, 0, 0.0).unwrap();
        a.set(1, 1, 0.2).unwrap();
        b.set(1, 1, -0.2).unwrap();

        let result = normalized_difference(&a, &b).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
        assert!(result.get(1, 1).unwrap().is_nan());
        // Everything else is finite
        let finite = result.data().iter().filter(|v| v.is_finite()).count();
        assert_eq!(finite, 7);
    }

    #[test]
    fn test_nodata_propagates() {
        let mut a = make_band(3, 3, 0.3);
        a.set_nodata(Some(-9999.0));
        a.set(2, 2, -9999.0).unwrap();
        let result = normalized_difference(&a, &make_band(3, 3, 0.1)).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
        assert!(result.get(0, 0).unwrap().is_finite());
    }

    #[test]
    fn test_size_mismatch() {
        let err = ndvi(&make_band(3, 3, 0.5), &make_band(3, 4, 0.1)).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }
}
