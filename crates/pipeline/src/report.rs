//! Run reports written next to each model artifact

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use glacis_algorithms::classification::ClassificationMetrics;
use glacis_core::Region;
use serde::{Deserialize, Serialize};

use crate::config::ModalityConfig;
use crate::modality::Modality;

/// Relative importance of one predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// One K-means cluster in original feature units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub size: usize,
    pub centroid: BTreeMap<String, f64>,
}

/// What the modeling stage produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSummary {
    Supervised {
        label_field: String,
        class_names: Vec<String>,
        /// Quantile edges of the label field
        edges: Vec<f64>,
        class_counts: Vec<usize>,
        train_size: usize,
        test_size: usize,
        /// Test-set metrics per model name
        metrics: BTreeMap<String, ClassificationMetrics>,
        /// Model used for the land-cover map
        selected: String,
        /// Random Forest mean decrease in impurity, highest first
        feature_importances: Vec<FeatureImportance>,
    },
    Unsupervised {
        k: usize,
        clusters: Vec<ClusterSummary>,
        inertia: f64,
        n_iter: usize,
    },
}

impl ModelSummary {
    /// Test accuracy of the selected model, if supervised
    pub fn selected_accuracy(&self) -> Option<f64> {
        match self {
            ModelSummary::Supervised { metrics, selected, .. } => metrics.get(selected).map(|m| m.accuracy),
            ModelSummary::Unsupervised { .. } => None,
        }
    }
}

/// Requested versus drawn samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    pub requested: usize,
    pub drawn: usize,
    /// Valid pixels inside the region before the cap
    pub candidates: usize,
}

/// Files written by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub model: PathBuf,
    pub report: PathBuf,
    pub samples: PathBuf,
    /// Per-model class scores or per-cluster centroids
    pub summary: PathBuf,
    pub landcover: PathBuf,
}

/// Summary of one study run, serialized as `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub modality: Modality,
    pub region: Region,
    pub seed: u64,
    /// Name of the imagery provider
    pub provider: String,
    pub generated_at: DateTime<Utc>,
    /// Scenes composited per period label
    pub scenes: BTreeMap<String, usize>,
    pub features: Vec<String>,
    pub auxiliary: Vec<String>,
    pub samples: SampleCounts,
    pub model: ModelSummary,
    /// Settings the run used
    pub config: ModalityConfig,
    pub outputs: OutputPaths,
}
