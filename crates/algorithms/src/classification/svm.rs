//! Support Vector Machine with an RBF kernel
//!
//! linfa's SMO solver trains binary machines; multi-class problems are
//! decided one-vs-one, with one machine per pair of classes and a vote over
//! all machines.

use crate::maybe_rayon::*;
use glacis_core::{Error, Result};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_svm::Svm;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::model::Classifier;
use super::{linfa_error, n_classes_of};

/// SVM parameters
#[derive(Debug, Clone)]
pub struct SvmParams {
    /// Soft-margin penalty
    pub c: f64,
    /// RBF width; `None` uses `1 / (p * Var(X))`
    pub gamma: Option<f64>,
    /// Solver stopping tolerance
    pub tol: f64,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            tol: 1e-3,
        }
    }
}

/// Binary machine voting `positive` against `negative`
#[derive(Serialize, Deserialize)]
struct PairMachine {
    positive: usize,
    negative: usize,
    svm: Svm<f64, bool>,
}

/// One-vs-one RBF SVM
#[derive(Serialize, Deserialize)]
pub struct SvmClassifier {
    pub gamma: f64,
    n_classes: usize,
    machines: Vec<PairMachine>,
}

impl fmt::Debug for SvmClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SvmClassifier")
            .field("gamma", &self.gamma)
            .field("n_classes", &self.n_classes)
            .field("machines", &self.machines.len())
            .finish()
    }
}

/// `1 / (p * Var(X))` over all entries, or 1 when X is constant
fn scale_gamma(x: &Array2<f64>) -> f64 {
    let var = x.var(0.0);
    let p = x.ncols().max(1) as f64;
    if var > 1e-12 {
        1.0 / (p * var)
    } else {
        1.0
    }
}

impl SvmClassifier {
    pub fn fit(x: &Array2<f64>, y: &[usize], params: &SvmParams) -> Result<Self> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(Error::DataAvailability(format!(
                "SVM needs matching non-empty data, got {} rows and {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if params.c.is_nan() || params.c <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "c",
                value: params.c.to_string(),
                reason: "must be positive".into(),
            });
        }
        let gamma = params.gamma.unwrap_or_else(|| scale_gamma(x));
        let n_classes = n_classes_of(y);

        let mut present = vec![false; n_classes];
        for &c in y {
            present[c] = true;
        }
        let classes: Vec<usize> = (0..n_classes).filter(|&c| present[c]).collect();
        let pairs: Vec<(usize, usize)> = classes
            .iter()
            .enumerate()
            .flat_map(|(i, &a)| classes[i + 1..].iter().map(move |&b| (a, b)))
            .collect();

        let machines = pairs
            .into_par_iter()
            .map(|(positive, negative)| {
                let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == positive || y[i] == negative).collect();
                let records = x.select(Axis(0), &rows);
                let targets: Array1<bool> = rows.iter().map(|&i| y[i] == positive).collect();
                // linfa's Gaussian kernel is exp(-|a-b|² / eps)
                let svm = Svm::<f64, bool>::params()
                    .pos_neg_weights(params.c, params.c)
                    .gaussian_kernel(1.0 / gamma)
                    .eps(params.tol)
                    .fit(&DatasetBase::new(records, targets))
                    .map_err(|e| linfa_error("svm", e))?;
                Ok(PairMachine {
                    positive,
                    negative,
                    svm,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            gamma,
            n_classes,
            machines,
        })
    }

    /// Number of binary machines, `k(k-1)/2` for `k` classes
    pub fn n_machines(&self) -> usize {
        self.machines.len()
    }
}

impl Classifier for SvmClassifier {
    fn name(&self) -> &'static str {
        "svm"
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        if self.machines.is_empty() {
            // A single training class
            let only = self.n_classes.saturating_sub(1);
            return Ok(vec![only; x.nrows()]);
        }
        let mut votes = vec![vec![0usize; self.n_classes]; x.nrows()];
        for machine in &self.machines {
            let decided: Array1<bool> = machine.svm.predict(&x);
            for (row_votes, &positive) in votes.iter_mut().zip(&decided) {
                let winner = if positive { machine.positive } else { machine.negative };
                row_votes[winner] += 1;
            }
        }
        // Ties go to the lower class index
        Ok(votes
            .iter()
            .map(|v| {
                let mut best = 0;
                for (i, &c) in v.iter().enumerate() {
                    if c > v[best] {
                        best = i;
                    }
                }
                best
            })
            .collect())
    }
}
