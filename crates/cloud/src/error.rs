//! Error types for imagery providers.

use thiserror::Error;

/// Errors produced while acquiring imagery.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("no {collection} scenes for {region} between {start} and {end}")]
    NoImagery {
        collection: String,
        region: String,
        start: String,
        end: String,
    },

    #[error("collection {0} is not available from this provider")]
    UnsupportedCollection(String),

    #[error("authentication rejected (HTTP {status}): {detail}")]
    Auth { status: u16, detail: String },

    #[error("request quota exceeded after {attempts} attempts")]
    Quota { attempts: u32 },

    #[error("HTTP {status} from {url}: {detail}")]
    Http {
        status: u16,
        url: String,
        detail: String,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("scene {scene} does not intersect the region bbox")]
    BBoxOutside { scene: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(#[from] glacis_core::Error),
}

impl CloudError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
