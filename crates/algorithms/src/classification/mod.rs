//! Classification and clustering of sample tables
//!
//! - **StandardScaler**: zero-mean, unit-variance feature scaling
//! - **Stratified split**: class-preserving train/test partition
//! - **Random Forest**: bagged linfa Gini trees over random feature subsets
//! - **SVM**: linfa RBF machines, one-vs-one
//! - **KNN**: k nearest neighbours from a linfa-nn k-d tree
//! - **K-means**: k-means++ initialisation with restarts
//! - **Metrics**: confusion matrix, accuracy, precision/recall/F1
//!
//! Every random choice draws from a `ChaCha8Rng` seeded by the caller, so a
//! fixed seed and identical input give identical models.

mod kmeans;
mod knn;
mod metrics;
mod model;
mod random_forest;
mod scaler;
mod split;
mod svm;

pub use kmeans::{kmeans, KMeansFit, KMeansModel, KMeansParams};
pub use knn::{KnnClassifier, KnnParams};
pub use metrics::{evaluate, ClassScore, ClassificationMetrics};
pub use model::{Classifier, FittedModel, LabelBinning, ModelArtifact};
pub use random_forest::{MaxFeatures, RandomForest, RandomForestParams};
pub use scaler::StandardScaler;
pub use split::stratified_split;
pub use svm::{SvmClassifier, SvmParams};

use glacis_core::Error;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Independent, reproducible RNG stream `stream` under `seed`
pub(crate) fn rng_stream(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Squared Euclidean distance
#[inline]
pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Wrap an error raised inside linfa
pub(crate) fn linfa_error(model: &str, err: impl std::fmt::Display) -> Error {
    Error::Algorithm(format!("{model}: {err}"))
}

/// Number of classes implied by labels `0..k`
pub(crate) fn n_classes_of(y: &[usize]) -> usize {
    y.iter().max().map_or(0, |&m| m + 1)
}
