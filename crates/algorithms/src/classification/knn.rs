//! k-nearest-neighbour classifier
//!
//! Neighbours come from a linfa-nn k-d tree built over the training rows.

use crate::maybe_rayon::*;
use glacis_core::{Error, Result};
use linfa_nn::distance::L2Dist;
use linfa_nn::{CommonNearestNeighbour, NearestNeighbour};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::model::Classifier;
use super::{linfa_error, n_classes_of};

#[derive(Debug, Clone)]
pub struct KnnParams {
    pub k: usize,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self { k: 5 }
    }
}

/// Majority vote among the `k` nearest training rows (Euclidean).
///
/// Vote ties go to the tied class whose member is nearest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    n_classes: usize,
    x_train: Array2<f64>,
    y_train: Vec<usize>,
}

impl KnnClassifier {
    pub fn fit(x: &Array2<f64>, y: &[usize], params: &KnnParams) -> Result<Self> {
        if params.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                value: "0".into(),
                reason: "need at least one neighbour".into(),
            });
        }
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(Error::DataAvailability(format!(
                "KNN needs matching non-empty data, got {} rows and {} labels",
                x.nrows(),
                y.len()
            )));
        }
        Ok(Self {
            k: params.k.min(x.nrows()),
            n_classes: n_classes_of(y),
            x_train: x.clone(),
            y_train: y.to_vec(),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Winning class among neighbour classes listed nearest first
    fn vote(&self, neighbours: &[usize]) -> usize {
        let mut votes = vec![0usize; self.n_classes];
        for &c in neighbours {
            votes[c] += 1;
        }
        let top = votes.iter().copied().max().unwrap_or(0);
        neighbours.iter().copied().find(|&c| votes[c] == top).unwrap_or(0)
    }
}

impl Classifier for KnnClassifier {
    fn name(&self) -> &'static str {
        "knn"
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        let index = CommonNearestNeighbour::KdTree
            .from_batch(&self.x_train, L2Dist)
            .map_err(|e| linfa_error("knn", e))?;
        (0..x.nrows())
            .into_par_iter()
            .map(|r| {
                let nearest = index.k_nearest(x.row(r), self.k).map_err(|e| linfa_error("knn", e))?;
                let classes: Vec<usize> = nearest.iter().map(|&(_, i)| self.y_train[i]).collect();
                Ok(self.vote(&classes))
            })
            .collect()
    }
}
