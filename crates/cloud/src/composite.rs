//! Per-pixel median compositing of scenes on a shared grid.

use std::collections::BTreeMap;

use glacis_core::{GeoTransform, Raster};

use crate::error::{CloudError, Result};

/// Named, aligned bands produced by a provider.
#[derive(Debug, Clone)]
pub struct Composite {
    pub bands: BTreeMap<String, Raster<f64>>,
    /// Scenes that contributed, in acquisition order
    pub scene_ids: Vec<String>,
}

impl Composite {
    pub fn scene_count(&self) -> usize {
        self.scene_ids.len()
    }

    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands
            .get(name)
            .ok_or_else(|| CloudError::Catalog(format!("composite has no band '{name}'")))
    }

    /// Grid shared by all bands
    pub fn grid(&self) -> Option<(GeoTransform, usize, usize)> {
        self.bands
            .values()
            .next()
            .map(|r| (*r.transform(), r.rows(), r.cols()))
    }
}

/// Accumulates scenes, aligning each band to the first band of the first
/// scene, and reduces them with a NaN-aware median.
#[derive(Debug, Default)]
pub struct MedianCompositor {
    grid: Option<(GeoTransform, usize, usize)>,
    stacks: BTreeMap<String, Vec<Raster<f64>>>,
    scene_ids: Vec<String>,
}

impl MedianCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one scene. Bands must be NaN-masked.
    pub fn add_scene(&mut self, id: &str, bands: BTreeMap<String, Raster<f64>>) {
        for (name, raster) in bands {
            let (transform, rows, cols) = *self
                .grid
                .get_or_insert((*raster.transform(), raster.rows(), raster.cols()));
            let aligned = if raster.transform() == &transform && raster.shape() == (rows, cols) {
                raster
            } else {
                raster.resample_to(&transform, rows, cols)
            };
            self.stacks.entry(name).or_default().push(aligned);
        }
        self.scene_ids.push(id.to_string());
    }

    pub fn scene_count(&self) -> usize {
        self.scene_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scene_ids.is_empty()
    }

    pub fn finish(self) -> Result<Composite> {
        let Some((transform, rows, cols)) = self.grid else {
            return Err(CloudError::Catalog("no scenes to composite".into()));
        };
        let mut bands = BTreeMap::new();
        let mut values = Vec::new();
        for (name, stack) in self.stacks {
            let mut out = Raster::filled(rows, cols, f64::NAN);
            out.set_transform(transform);
            out.set_nodata(Some(f64::NAN));
            for row in 0..rows {
                for col in 0..cols {
                    values.clear();
                    for r in &stack {
                        // SAFETY: every stacked raster was aligned to (rows, cols)
                        let v = unsafe { r.get_unchecked(row, col) };
                        if v.is_finite() {
                            values.push(v);
                        }
                    }
                    if let Some(m) = median(&mut values) {
                        out.set(row, col, m)?;
                    }
                }
            }
            bands.insert(name, out);
        }
        Ok(Composite {
            bands,
            scene_ids: self.scene_ids,
        })
    }
}

/// Median of finite values; the mean of the middle pair for even counts.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
