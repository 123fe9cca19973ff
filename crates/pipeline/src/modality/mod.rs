//! Acquisition and feature derivation for each study
//!
//! Every modality turns two provider composites into a [`LayerStack`] on one
//! grid. Everything after that (sampling, modeling, persistence) is shared.

mod dem;
mod landsat8;
mod sentinel1;
mod sentinel2;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use glacis_algorithms::imagery::{linear_to_db, scale_offset};
use glacis_cloud::{Collection, Composite, ImageryProvider, ImageryRequest, ValueScale};
use glacis_core::{GeoTransform, LayerStack, Raster};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ModalityConfig, Period, StudyConfig};
use crate::error::{PipelineError, Result, Stage};

/// The four studies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Dem,
    Sentinel1,
    Sentinel2,
    Landsat8,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Dem,
        Modality::Sentinel1,
        Modality::Sentinel2,
        Modality::Landsat8,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Modality::Dem => "dem",
            Modality::Sentinel1 => "sentinel1",
            Modality::Sentinel2 => "sentinel2",
            Modality::Landsat8 => "landsat8",
        }
    }

    /// Whether the study fits classifiers on quantile labels
    pub fn is_supervised(&self) -> bool {
        matches!(self, Modality::Dem | Modality::Landsat8)
    }

    /// Collections queried for the baseline and comparison periods
    pub fn collections(&self) -> [Collection; 2] {
        match self {
            Modality::Dem => [Collection::Srtm, Collection::AsterGdem],
            Modality::Sentinel1 => [Collection::Sentinel1Grd; 2],
            Modality::Sentinel2 => [Collection::Sentinel2Msi; 2],
            Modality::Landsat8 => [Collection::Landsat8C2L2; 2],
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Modality {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dem" | "terrain" => Ok(Modality::Dem),
            "sentinel1" | "s1" | "sar" => Ok(Modality::Sentinel1),
            "sentinel2" | "s2" | "optical" => Ok(Modality::Sentinel2),
            "landsat8" | "l8" | "thermal" => Ok(Modality::Landsat8),
            _ => Err(PipelineError::Config(format!(
                "unknown modality '{s}' (expected dem, sentinel1, sentinel2 or landsat8)"
            ))),
        }
    }
}

/// Layer a supervised study bins into classes
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSource {
    /// Auxiliary layer name
    pub field: String,
    /// One name per class, lowest quantile first
    pub class_names: Vec<String>,
}

/// Output of the acquisition and feature stages
#[derive(Debug, Clone)]
pub struct StudyData {
    pub stack: LayerStack,
    /// Scenes composited per period label
    pub scenes: BTreeMap<String, usize>,
    pub label: Option<LabelSource>,
}

/// Fetch composites and derive the layer stack of one study.
pub fn build_study(modality: Modality, provider: &dyn ImageryProvider, config: &StudyConfig) -> Result<StudyData> {
    let study = Study {
        modality,
        provider,
        config,
        settings: config.modality(modality),
    };
    let data = match modality {
        Modality::Dem => dem::build(&study)?,
        Modality::Sentinel1 => sentinel1::build(&study)?,
        Modality::Sentinel2 => sentinel2::build(&study)?,
        Modality::Landsat8 => landsat8::build(&study)?,
    };
    if let Some((rows, cols)) = data.stack.shape() {
        info!(
            %modality,
            rows,
            cols,
            features = data.stack.features().count(),
            auxiliary = data.stack.auxiliaries().count(),
            "layer stack ready"
        );
    }
    Ok(data)
}

/// What a modality builder needs from the run
pub(crate) struct Study<'a> {
    pub modality: Modality,
    pub provider: &'a dyn ImageryProvider,
    pub config: &'a StudyConfig,
    pub settings: &'a ModalityConfig,
}

impl Study<'_> {
    /// Baseline and comparison periods
    pub fn periods(&self) -> (&Period, &Period) {
        (&self.settings.periods[0], &self.settings.periods[1])
    }

    /// Composite `bands` of `collection` over `period` with the study filter.
    pub fn fetch(&self, collection: Collection, period: &Period, bands: &[&str]) -> Result<Composite> {
        let request = ImageryRequest::new(collection, self.config.region.clone(), period.dates)
            .with_filter(self.settings.filter.clone())
            .with_bands(bands);
        debug!(
            modality = %self.modality,
            %collection,
            period = %period.label,
            dates = %period.dates,
            provider = self.provider.name(),
            "requesting composite"
        );
        let composite = self
            .provider
            .composite(&request)
            .map_err(|e| PipelineError::at(self.modality, Stage::Acquisition, e))?;
        info!(
            modality = %self.modality,
            %collection,
            period = %period.label,
            scenes = composite.scene_count(),
            "composite fetched"
        );
        Ok(composite)
    }

    /// One band of a composite in physical units
    pub fn band(&self, composite: &Composite, collection: Collection, band: &str) -> Result<Raster<f64>> {
        let raw = composite
            .band(band)
            .map_err(|e| PipelineError::at(self.modality, Stage::Acquisition, e))?;
        calibrate(collection, band, raw).map_err(|e| self.features_error(e))
    }

    pub fn features_error(&self, err: impl Into<PipelineError>) -> PipelineError {
        PipelineError::at(self.modality, Stage::Features, err)
    }
}

/// Apply the collection's value scaling to a raw band.
pub fn calibrate(collection: Collection, band: &str, raster: &Raster<f64>) -> glacis_core::Result<Raster<f64>> {
    match collection.value_scale(band) {
        ValueScale::Identity => Ok(raster.clone()),
        ValueScale::Linear { scale, offset } => scale_offset(raster, scale, offset),
        ValueScale::LinearPower => linear_to_db(raster),
    }
}

/// Nearest-neighbour alignment onto a reference grid
pub(crate) struct Aligner {
    transform: GeoTransform,
    rows: usize,
    cols: usize,
}

impl Aligner {
    pub fn new(reference: &Raster<f64>) -> Self {
        Self {
            transform: *reference.transform(),
            rows: reference.rows(),
            cols: reference.cols(),
        }
    }

    pub fn align(&self, raster: Raster<f64>) -> Raster<f64> {
        if raster.transform() == &self.transform && raster.shape() == (self.rows, self.cols) {
            raster
        } else {
            raster.resample_to(&self.transform, self.rows, self.cols)
        }
    }
}
