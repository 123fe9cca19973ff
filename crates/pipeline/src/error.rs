//! Error types for study runs.

use std::fmt;

use glacis_cloud::CloudError;
use thiserror::Error;

/// Stage of a study run, used to locate data-availability failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquisition,
    Features,
    Sampling,
    Labels,
    Modeling,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Acquisition => "acquisition",
            Stage::Features => "feature derivation",
            Stage::Sampling => "sampling",
            Stage::Labels => "label construction",
            Stage::Modeling => "modeling",
            Stage::Persistence => "persistence",
        };
        f.write_str(s)
    }
}

/// Errors produced by a study run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{modality}: not enough data at {stage}: {detail} (try widening the date range or region)")]
    DataAvailability {
        modality: String,
        stage: Stage,
        detail: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("label leakage on '{field}': {reason}")]
    Leakage { field: String, reason: String },

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Core(#[from] glacis_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    /// Attach study context, folding provider and core availability
    /// failures into [`PipelineError::DataAvailability`].
    pub fn at(modality: impl fmt::Display, stage: Stage, err: impl Into<PipelineError>) -> Self {
        match err.into() {
            PipelineError::Cloud(e @ CloudError::NoImagery { .. }) => PipelineError::DataAvailability {
                modality: modality.to_string(),
                stage,
                detail: e.to_string(),
            },
            PipelineError::Core(glacis_core::Error::DataAvailability(detail)) => {
                PipelineError::DataAvailability {
                    modality: modality.to_string(),
                    stage,
                    detail,
                }
            }
            PipelineError::Core(glacis_core::Error::Leakage { field, reason }) => {
                PipelineError::Leakage { field, reason }
            }
            other => other,
        }
    }

    pub fn is_data_availability(&self) -> bool {
        matches!(self, PipelineError::DataAvailability { .. })
    }
}

/// Result alias for study runs.
pub type Result<T> = std::result::Result<T, PipelineError>;
