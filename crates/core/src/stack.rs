//! Aligned layers of one study
//!
//! A `LayerStack` holds every per-pixel layer a study derives, all on the
//! same grid. Each layer is either a model feature or an auxiliary column
//! (carried into the sample table but never used as a predictor). Label
//! sources are auxiliary by construction.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

/// Whether a layer is a predictor or carried alongside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Feature,
    Auxiliary,
}

/// A named raster layer with its provenance
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub role: LayerRole,
    /// Names of the layers this one was computed from
    pub sources: Vec<String>,
    pub raster: Raster<f64>,
}

/// Ordered collection of aligned layers.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predictor layer.
    pub fn push_feature(&mut self, name: &str, raster: Raster<f64>, sources: &[&str]) -> Result<()> {
        self.push(name, LayerRole::Feature, raster, sources)
    }

    /// Add a layer that is sampled but never used as a predictor.
    pub fn push_auxiliary(&mut self, name: &str, raster: Raster<f64>, sources: &[&str]) -> Result<()> {
        self.push(name, LayerRole::Auxiliary, raster, sources)
    }

    fn push(&mut self, name: &str, role: LayerRole, raster: Raster<f64>, sources: &[&str]) -> Result<()> {
        if self.get(name).is_some() {
            return Err(Error::InvalidParameter {
                name: "layer",
                value: name.to_string(),
                reason: "duplicate layer name".into(),
            });
        }
        if let Some(first) = self.layers.first() {
            let (er, ec) = first.raster.shape();
            let (ar, ac) = raster.shape();
            if (er, ec) != (ar, ac) {
                return Err(Error::SizeMismatch { er, ec, ar, ac });
            }
        }
        self.layers.push(Layer {
            name: name.to_string(),
            role,
            sources: sources.iter().map(|s| s.to_string()).collect(),
            raster,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Feature layers, in insertion order
    pub fn features(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.role == LayerRole::Feature)
    }

    /// Auxiliary layers, in insertion order
    pub fn auxiliaries(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.role == LayerRole::Auxiliary)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features().map(|l| l.name.clone()).collect()
    }

    pub fn auxiliary_names(&self) -> Vec<String> {
        self.auxiliaries().map(|l| l.name.clone()).collect()
    }

    /// Grid shape shared by all layers
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.layers.first().map(|l| l.raster.shape())
    }

    /// Transform shared by all layers
    pub fn transform(&self) -> Option<GeoTransform> {
        self.layers.first().map(|l| *l.raster.transform())
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Feature values at a cell, in feature order. `None` if any is non-finite.
    pub fn feature_vector_at(&self, row: usize, col: usize) -> Option<Vec<f64>> {
        let mut out = Vec::new();
        for layer in self.features() {
            let v = layer.raster.get(row, col).ok()?;
            if !v.is_finite() {
                return None;
            }
            out.push(v);
        }
        Some(out)
    }
}
