//! Random Forest classifier
//!
//! An ensemble of linfa Gini trees. Each tree is grown on a bootstrap sample
//! of the rows and a random subset of the feature columns; the forest
//! predicts by majority vote.

use crate::maybe_rayon::*;
use glacis_core::{Error, Result};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::model::Classifier;
use super::{linfa_error, n_classes_of, rng_stream};

/// Number of feature columns given to each tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    /// `round(sqrt(p))`, at least two columns when there are two
    #[default]
    Sqrt,
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(self, p: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => ((p as f64).sqrt().round() as usize).max(2).min(p),
            MaxFeatures::All => p,
        }
    }
}

/// Random Forest parameters
#[derive(Debug, Clone)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub max_features: MaxFeatures,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// A tree and the feature columns it was grown on
#[derive(Serialize, Deserialize)]
struct SubspaceTree {
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

#[derive(Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<SubspaceTree>,
    n_classes: usize,
    /// Mean decrease in impurity per feature, summing to 1
    pub feature_importances: Vec<f64>,
}

impl fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForest")
            .field("n_trees", &self.trees.len())
            .field("n_classes", &self.n_classes)
            .field("feature_importances", &self.feature_importances)
            .finish_non_exhaustive()
    }
}

impl RandomForest {
    pub fn fit(x: &Array2<f64>, y: &[usize], params: &RandomForestParams) -> Result<Self> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(Error::DataAvailability(format!(
                "random forest needs matching non-empty data, got {} rows and {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(Error::InvalidParameter {
                name: "n_trees",
                value: "0".into(),
                reason: "need at least one tree".into(),
            });
        }

        let n = x.nrows();
        let p = x.ncols();
        let m = params.max_features.resolve(p);

        // One RNG stream per tree keeps the result independent of scheduling
        let trees: Vec<SubspaceTree> = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = rng_stream(params.seed, t as u64);
                let rows: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut features = sample(&mut rng, p, m).into_vec();
                features.sort_unstable();

                let records = x.select(Axis(0), &rows).select(Axis(1), &features);
                let targets: Array1<usize> = rows.iter().map(|&i| y[i]).collect();
                let tree = DecisionTree::<f64, usize>::params()
                    .split_quality(SplitQuality::Gini)
                    .max_depth(params.max_depth)
                    .min_weight_split(params.min_samples_split as f32)
                    .fit(&DatasetBase::new(records, targets))
                    .map_err(|e| linfa_error("random forest", e))?;
                Ok(SubspaceTree { features, tree })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut importances = vec![0.0; p];
        for t in &trees {
            let tree_importance = t.tree.feature_importance();
            let total: f64 = tree_importance.iter().sum();
            if total > 0.0 {
                for (&col, v) in t.features.iter().zip(&tree_importance) {
                    importances[col] += v / total;
                }
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(Self {
            trees,
            n_classes: n_classes_of(y),
            feature_importances: importances,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Index of the largest count; ties go to the lowest index
fn argmax(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        let per_tree: Vec<Array1<usize>> = self
            .trees
            .as_slice()
            .into_par_iter()
            .map(|t| t.tree.predict(&x.select(Axis(1), &t.features)))
            .collect();

        let mut votes = vec![vec![0usize; self.n_classes]; x.nrows()];
        for predicted in &per_tree {
            for (row_votes, &class) in votes.iter_mut().zip(predicted) {
                if let Some(v) = row_votes.get_mut(class) {
                    *v += 1;
                }
            }
        }
        Ok(votes.iter().map(|v| argmax(v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Two informative features and one noise feature, 3 classes
    fn blobs() -> (Array2<f64>, Vec<usize>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..90 {
            let c = i % 3;
            let jitter = ((i * 7919) % 13) as f64 / 13.0 - 0.5;
            rows.extend_from_slice(&[c as f64 * 3.0 + jitter, -(c as f64) * 2.0 + 0.3 * jitter, jitter * 5.0]);
            y.push(c);
        }
        (Array2::from_shape_vec((90, 3), rows).unwrap(), y)
    }

    #[test]
    fn fits_separable_classes() {
        let (x, y) = blobs();
        let rf = RandomForest::fit(&x, &y, &RandomForestParams { n_trees: 25, ..Default::default() }).unwrap();
        let pred = rf.predict(x.view()).unwrap();
        let correct = pred.iter().zip(&y).filter(|(p, t)| p == t).count();
        assert!(correct >= 88, "{correct}/90");
        assert_eq!(rf.n_trees(), 25);
    }

    #[test]
    fn importances_sum_to_one_and_favour_signal() {
        let (x, y) = blobs();
        let rf = RandomForest::fit(&x, &y, &RandomForestParams { n_trees: 30, ..Default::default() }).unwrap();
        let sum: f64 = rf.feature_importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(rf.feature_importances[2] < rf.feature_importances[0]);
        assert!(rf.feature_importances[2] < rf.feature_importances[1]);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = blobs();
        let params = RandomForestParams { n_trees: 10, seed: 3, ..Default::default() };
        let a = serde_json::to_string(&RandomForest::fit(&x, &y, &params).unwrap()).unwrap();
        let b = serde_json::to_string(&RandomForest::fit(&x, &y, &params).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn subspace_keeps_two_columns() {
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::Sqrt.resolve(2), 2);
        assert_eq!(MaxFeatures::Sqrt.resolve(8), 3);
        assert_eq!(MaxFeatures::All.resolve(8), 8);
    }

    #[test]
    fn argmax_ties_go_low() {
        assert_eq!(argmax(&[1, 3, 3]), 1);
    }
}
