//! # glacis algorithms
//!
//! Per-pixel feature derivation and the learning stack used by the glacis
//! studies.
//!
//! ## Categories
//!
//! - **imagery**: normalized difference indices, calibration, change detection
//! - **terrain**: slope, aspect, hillshade, TPI, TRI and derived terrain classes
//! - **sampling**: bounded pixel sampling from a layer stack
//! - **labels**: quantile binning of a continuous label source
//! - **classification**: scaler, split, Random Forest, SVM, KNN, K-means, metrics

pub mod classification;
pub mod imagery;
pub mod labels;
pub mod sampling;
pub mod terrain;

pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        kmeans, ClassificationMetrics, Classifier, KMeansModel, KMeansParams, KnnClassifier,
        ModelArtifact, RandomForest, RandomForestParams, StandardScaler, SvmClassifier, SvmParams,
    };
    pub use crate::imagery::{
        linear_to_db, ndsi, ndvi, normalized_difference, polarization_difference,
        raster_difference, scale_offset,
    };
    pub use crate::labels::{quantile_bins, QuantileLabels};
    pub use crate::sampling::{sample_stack, SampleParams, SamplingStrategy};
    pub use crate::terrain::{
        aspect, aspect_components, hillshade, slope, slope_classes, tpi, tri, Aspect,
        AspectParams, GridUnits, Hillshade, HillshadeParams, Slope, SlopeParams, Tpi, TpiParams,
        Tri, TriParams,
    };
    pub use glacis_core::prelude::*;
}
