//! # glacis pipeline
//!
//! The four Gangotri studies behind one run function.
//!
//! A study fetches two composites from an [`ImageryProvider`], derives a
//! [`LayerStack`](glacis_core::LayerStack) of features and auxiliary layers,
//! draws a bounded sample, fits either classifiers on quantile labels or
//! K-means clusters, and writes the model, report, samples and land-cover
//! map under `<output_dir>/<modality>/`.
//!
//! ```no_run
//! use glacis_cloud::LocalArchive;
//! use glacis_pipeline::{run_study, Modality, StudyConfig};
//!
//! let archive = LocalArchive::open("archive")?;
//! let report = run_study(Modality::Dem, &archive, &StudyConfig::default())?;
//! println!("{:?}", report.model.selected_accuracy());
//! # Ok::<(), glacis_pipeline::PipelineError>(())
//! ```
//!
//! [`ImageryProvider`]: glacis_cloud::ImageryProvider

pub mod config;
pub mod error;
pub mod modality;
pub mod modeling;
pub mod persist;
pub mod report;
pub mod runner;

pub use config::{ModalityConfig, Period, StudyConfig};
pub use error::{PipelineError, Result, Stage};
pub use modality::{build_study, calibrate, LabelSource, Modality, StudyData};
pub use modeling::{check_leakage, fit_supervised, fit_unsupervised, ModelFit};
pub use report::{ClusterSummary, FeatureImportance, ModelSummary, OutputPaths, RunReport, SampleCounts};
pub use runner::{run_all, run_study};
