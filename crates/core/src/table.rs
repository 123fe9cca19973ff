//! Tabular sample drawn from a layer stack

use std::collections::BTreeMap;

use ndarray::Array2;

use crate::error::{Error, Result};

/// One sampled pixel: its location and the values of every column.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub row: usize,
    pub col: usize,
    /// Map x of the pixel centre (longitude for geographic grids)
    pub x: f64,
    /// Map y of the pixel centre (latitude for geographic grids)
    pub y: f64,
    /// Values in `SampleTable::feature_names` order
    pub features: Vec<f64>,
    /// Values in `SampleTable::auxiliary_names` order
    pub auxiliary: Vec<f64>,
}

/// Bounded sample of feature vectors plus auxiliary columns.
///
/// Created fresh per run and discarded once the model is fitted.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    feature_names: Vec<String>,
    auxiliary_names: Vec<String>,
    /// Column name -> names of the layers it was derived from
    sources: BTreeMap<String, Vec<String>>,
    samples: Vec<Sample>,
}

impl SampleTable {
    pub fn new(feature_names: Vec<String>, auxiliary_names: Vec<String>) -> Self {
        Self {
            feature_names,
            auxiliary_names,
            sources: BTreeMap::new(),
            samples: Vec::new(),
        }
    }

    /// Record the provenance of a column.
    pub fn set_sources(&mut self, column: &str, sources: Vec<String>) {
        self.sources.insert(column.to_string(), sources);
    }

    /// Layers a column was derived from (empty when it is a raw band).
    pub fn sources_of(&self, column: &str) -> &[String] {
        self.sources.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push(&mut self, sample: Sample) -> Result<()> {
        if sample.features.len() != self.feature_names.len()
            || sample.auxiliary.len() != self.auxiliary_names.len()
        {
            return Err(Error::InvalidDimensions {
                width: sample.features.len() + sample.auxiliary.len(),
                height: 1,
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn auxiliary_names(&self) -> &[String] {
        &self.auxiliary_names
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether `name` is one of the predictor columns
    pub fn is_feature(&self, name: &str) -> bool {
        self.feature_names.iter().any(|f| f == name)
    }

    /// Values of a feature or auxiliary column, in sample order
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        if let Some(i) = self.feature_names.iter().position(|f| f == name) {
            return Ok(self.samples.iter().map(|s| s.features[i]).collect());
        }
        if let Some(i) = self.auxiliary_names.iter().position(|f| f == name) {
            return Ok(self.samples.iter().map(|s| s.auxiliary[i]).collect());
        }
        Err(Error::UnknownField(name.to_string()))
    }

    /// Feature matrix (n_samples x n_features)
    pub fn feature_matrix(&self) -> Array2<f64> {
        let n = self.samples.len();
        let p = self.feature_names.len();
        Array2::from_shape_fn((n, p), |(i, j)| self.samples[i].features[j])
    }
}
