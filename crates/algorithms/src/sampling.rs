//! Bounded pixel sampling from a layer stack
//!
//! Turns aligned rasters into a `SampleTable` of at most `cap` rows. A pixel
//! is a candidate when its centre lies inside the study region and every
//! feature and auxiliary layer is finite there.

use glacis_core::{Error, LayerStack, Region, Result, Sample, SampleTable};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// How candidates are reduced to the cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    /// Uniform without replacement
    #[default]
    Random,
    /// Evenly spaced candidates in raster order
    Grid,
}

/// Sampling parameters
#[derive(Debug, Clone)]
pub struct SampleParams {
    /// Maximum number of rows
    pub cap: usize,
    pub strategy: SamplingStrategy,
    pub seed: u64,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            cap: 1000,
            strategy: SamplingStrategy::Random,
            seed: 42,
        }
    }
}

/// Row-major flags marking cells whose centre lies inside `region`.
///
/// The stack grid must be geographic (degrees).
pub fn region_mask(stack: &LayerStack, region: &Region) -> Vec<bool> {
    let (Some((rows, cols)), Some(transform)) = (stack.shape(), stack.transform()) else {
        return Vec::new();
    };
    let mut mask = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let (lon, lat) = transform.pixel_to_geo(col, row);
            mask.push(region.contains(lon, lat));
        }
    }
    mask
}

/// Row-major indices of all sampling candidates
pub fn candidates(stack: &LayerStack, region: &Region) -> Vec<usize> {
    let Some((_, cols)) = stack.shape() else {
        return Vec::new();
    };
    region_mask(stack, region)
        .into_iter()
        .enumerate()
        .filter(|&(idx, inside)| {
            let (row, col) = (idx / cols, idx % cols);
            inside
                && stack
                    .layers()
                    .iter()
                    .all(|l| l.raster.get(row, col).is_ok_and(f64::is_finite))
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Draw a bounded sample table from `stack`.
///
/// Returns `min(cap, M)` rows sorted by pixel index, where M is the number of
/// candidates. Fails with `Error::DataAvailability` when M is zero. Callers
/// can compare `len()` with `cap` to detect a short sample.
pub fn sample_stack(stack: &LayerStack, region: &Region, params: &SampleParams) -> Result<SampleTable> {
    if params.cap == 0 {
        return Err(Error::InvalidParameter {
            name: "cap",
            value: "0".into(),
            reason: "sample cap must be at least 1".into(),
        });
    }

    let pool = candidates(stack, region);
    if pool.is_empty() {
        return Err(Error::DataAvailability(format!(
            "no valid pixels inside {} for {} layers",
            region.name,
            stack.len()
        )));
    }

    let chosen = select(&pool, params);

    let mut table = SampleTable::new(stack.feature_names(), stack.auxiliary_names());
    for layer in stack.layers() {
        table.set_sources(&layer.name, layer.sources.clone());
    }

    let (_, cols) = stack.shape().unwrap_or((0, 0));
    let transform = stack.transform().unwrap_or_default();
    for idx in chosen {
        let (row, col) = (idx / cols, idx % cols);
        let (x, y) = transform.pixel_to_geo(col, row);
        let features = stack
            .features()
            .map(|l| l.raster.get(row, col))
            .collect::<Result<Vec<_>>>()?;
        let auxiliary = stack
            .auxiliaries()
            .map(|l| l.raster.get(row, col))
            .collect::<Result<Vec<_>>>()?;
        table.push(Sample {
            row,
            col,
            x,
            y,
            features,
            auxiliary,
        })?;
    }
    Ok(table)
}

/// Pick `min(cap, pool.len())` entries of `pool`, in ascending order.
fn select(pool: &[usize], params: &SampleParams) -> Vec<usize> {
    let m = pool.len();
    let n = params.cap.min(m);
    if n == m {
        return pool.to_vec();
    }
    match params.strategy {
        SamplingStrategy::Random => {
            let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
            let mut picked: Vec<usize> = index::sample(&mut rng, m, n).into_iter().map(|i| pool[i]).collect();
            picked.sort_unstable();
            picked
        }
        SamplingStrategy::Grid => (0..n).map(|i| pool[i * m / n]).collect(),
    }
}
