//! K-means clustering of sample rows
//!
//! Lloyd iterations from k-means++ seeds, restarted `n_init` times; the run
//! with the lowest inertia wins.

use crate::maybe_rayon::*;
use glacis_core::{Error, Result};
use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::model::Classifier;
use super::{rng_stream, squared_distance};

/// Parameters for K-means clustering
#[derive(Debug, Clone)]
pub struct KMeansParams {
    /// Number of clusters
    pub k: usize,
    /// Independent k-means++ restarts
    pub n_init: usize,
    /// Maximum Lloyd iterations per restart
    pub max_iter: usize,
    /// Stop when the summed squared centroid shift falls below
    /// `tol * mean(column variance)`
    pub tol: f64,
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 3,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed: 42,
        }
    }
}

/// Fitted centroids, in the space the model was trained in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansModel {
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances of training rows to their centroid
    pub inertia: f64,
    pub n_iter: usize,
}

/// Result of [`kmeans`]: the model plus the training assignments
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub model: KMeansModel,
    pub labels: Vec<usize>,
}

impl KMeansModel {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Nearest centroid and its squared distance; ties go to the lower index
    pub fn nearest(&self, row: &[f64]) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);
        for (c, centroid) in self.centroids.iter().enumerate() {
            let d = squared_distance(row, centroid);
            if d < best.1 {
                best = (c, d);
            }
        }
        best
    }

    /// Number of rows assigned to each cluster
    pub fn cluster_sizes(&self, labels: &[usize]) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &l in labels {
            sizes[l] += 1;
        }
        sizes
    }
}

impl Classifier for KMeansModel {
    fn name(&self) -> &'static str {
        "kmeans"
    }

    fn n_classes(&self) -> usize {
        self.k()
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        Ok(x.rows().into_iter().map(|row| self.nearest(&row.to_vec()).0).collect())
    }
}

/// k-means++: first centre uniform, then each next centre drawn with
/// probability proportional to squared distance to the closest centre.
fn kmeans_plus_plus<R: Rng>(rows: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut centroids = vec![rows[rng.gen_range(0..n)].clone()];
    let mut d2: Vec<f64> = rows.iter().map(|r| squared_distance(r, &centroids[0])).collect();

    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total <= 0.0 {
            // All rows coincide with a centre
            rng.gen_range(0..n)
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = n - 1;
            for (i, &d) in d2.iter().enumerate() {
                if target < d {
                    pick = i;
                    break;
                }
                target -= d;
            }
            pick
        };
        let centre = rows[next].clone();
        for (d, r) in d2.iter_mut().zip(rows) {
            *d = d.min(squared_distance(r, &centre));
        }
        centroids.push(centre);
    }
    centroids
}

fn assign(rows: &[Vec<f64>], centroids: &[Vec<f64>]) -> (Vec<usize>, Vec<f64>) {
    let model = KMeansModel {
        centroids: centroids.to_vec(),
        inertia: 0.0,
        n_iter: 0,
    };
    rows.iter().map(|r| model.nearest(r)).unzip()
}

fn lloyd<R: Rng>(rows: &[Vec<f64>], params: &KMeansParams, tol: f64, rng: &mut R) -> KMeansFit {
    let p = rows[0].len();
    let mut centroids = kmeans_plus_plus(rows, params.k, rng);
    let mut n_iter = 0;

    for _ in 0..params.max_iter {
        n_iter += 1;
        let (labels, dists) = assign(rows, &centroids);

        let mut sums = vec![vec![0.0; p]; params.k];
        let mut counts = vec![0usize; params.k];
        for (row, &l) in rows.iter().zip(&labels) {
            counts[l] += 1;
            for (s, v) in sums[l].iter_mut().zip(row) {
                *s += v;
            }
        }

        let mut new_centroids = sums;
        for (c, centroid) in new_centroids.iter_mut().enumerate() {
            if counts[c] > 0 {
                centroid.iter_mut().for_each(|v| *v /= counts[c] as f64);
            } else {
                // Reseed an empty cluster on the row farthest from its centre
                let far = dists
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map_or(0, |(i, _)| i);
                centroid.clone_from(&rows[far]);
            }
        }

        let shift: f64 = centroids
            .iter()
            .zip(&new_centroids)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = new_centroids;
        if shift <= tol {
            break;
        }
    }

    let (labels, dists) = assign(rows, &centroids);
    KMeansFit {
        model: KMeansModel {
            centroids,
            inertia: dists.iter().sum(),
            n_iter,
        },
        labels,
    }
}

/// Cluster the rows of `x` into `params.k` groups.
///
/// Fewer rows than clusters is a data-availability error.
pub fn kmeans(x: &Array2<f64>, params: &KMeansParams) -> Result<KMeansFit> {
    if params.k < 2 {
        return Err(Error::InvalidParameter {
            name: "k",
            value: params.k.to_string(),
            reason: "K-means requires k >= 2".into(),
        });
    }
    if x.nrows() < params.k {
        return Err(Error::DataAvailability(format!(
            "{} samples are not enough for {} clusters",
            x.nrows(),
            params.k
        )));
    }
    if x.ncols() == 0 {
        return Err(Error::DataAvailability("no features to cluster".into()));
    }

    let rows: Vec<Vec<f64>> = x.rows().into_iter().map(|r| r.to_vec()).collect();
    let mean_var = x.var_axis(ndarray::Axis(0), 0.0).mean().unwrap_or(0.0);
    let tol = params.tol * mean_var;

    let fits: Vec<KMeansFit> = (0..params.n_init.max(1))
        .into_par_iter()
        .map(|run| {
            let mut rng = rng_stream(params.seed, run as u64);
            lloyd(&rows, params, tol, &mut rng)
        })
        .collect();

    // Lowest inertia; ties keep the earliest restart
    fits.into_iter()
        .reduce(|best, f| if f.model.inertia < best.model.inertia { f } else { best })
        .ok_or_else(|| Error::Algorithm("K-means produced no runs".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_blobs() -> Array2<f64> {
        let centres = [[-5.0, 0.0], [0.0, 5.0], [5.0, 0.0]];
        let mut data = Vec::new();
        for i in 0..60 {
            let c = centres[i % 3];
            let jitter = ((i * 31) % 7) as f64 / 7.0 - 0.5;
            data.extend_from_slice(&[c[0] + jitter, c[1] - jitter]);
        }
        Array2::from_shape_vec((60, 2), data).unwrap()
    }

    #[test]
    fn recovers_blobs() {
        let x = three_blobs();
        let fit = kmeans(&x, &KMeansParams { k: 3, ..Default::default() }).unwrap();
        let sizes = fit.model.cluster_sizes(&fit.labels);
        assert_eq!(sizes.iter().filter(|&&s| s == 20).count(), 3);
        // Rows from the same blob share a label
        for i in 3..60 {
            assert_eq!(fit.labels[i], fit.labels[i % 3]);
        }
        assert!(fit.model.inertia < 60.0);
    }

    #[test]
    fn deterministic_for_seed() {
        let x = three_blobs();
        let p = KMeansParams { k: 4, seed: 5, ..Default::default() };
        assert_eq!(kmeans(&x, &p).unwrap().model, kmeans(&x, &p).unwrap().model);
    }

    #[test]
    fn too_few_rows() {
        let x = Array2::zeros((2, 2));
        let err = kmeans(&x, &KMeansParams { k: 3, ..Default::default() }).unwrap_err();
        assert!(matches!(err, Error::DataAvailability(_)));
        assert!(kmeans(&x, &KMeansParams { k: 1, ..Default::default() }).is_err());
    }

    #[test]
    fn predict_uses_nearest_centroid() {
        let model = KMeansModel { centroids: vec![vec![0.0, 0.0], vec![10.0, 0.0]], inertia: 0.0, n_iter: 1 };
        assert_eq!(model.predict_row(ndarray::array![7.0, 1.0].view()).unwrap(), 1);
    }
}
