//! Classifier contract and the persisted model artifact

use crate::maybe_rayon::*;
use glacis_core::{Error, LayerStack, Raster, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::kmeans::KMeansModel;
use super::knn::KnnClassifier;
use super::random_forest::RandomForest;
use super::scaler::StandardScaler;
use super::svm::SvmClassifier;

/// A fitted model that maps (scaled) feature rows to class indices.
pub trait Classifier: Send + Sync {
    /// Short identifier used in reports
    fn name(&self) -> &'static str;

    fn n_classes(&self) -> usize;

    /// Class of every row of `x`
    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>>;

    fn predict_row(&self, row: ArrayView1<f64>) -> Result<usize> {
        self.predict(row.insert_axis(Axis(0)))?
            .first()
            .copied()
            .ok_or_else(|| Error::Algorithm(format!("{} returned no prediction", self.name())))
    }
}

/// Any model a study can persist
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    RandomForest(RandomForest),
    Svm(SvmClassifier),
    Knn(KnnClassifier),
    #[serde(rename = "kmeans")]
    KMeans(KMeansModel),
}

impl FittedModel {
    pub fn as_classifier(&self) -> &dyn Classifier {
        match self {
            FittedModel::RandomForest(m) => m,
            FittedModel::Svm(m) => m,
            FittedModel::Knn(m) => m,
            FittedModel::KMeans(m) => m,
        }
    }

    pub fn name(&self) -> &'static str {
        self.as_classifier().name()
    }
}

/// How supervised labels were built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelBinning {
    /// Auxiliary column the labels were binned from
    pub field: String,
    /// Quantile edges, `n_classes + 1` values
    pub edges: Vec<f64>,
    /// Human-readable meaning of each class
    pub class_names: Vec<String>,
}

/// Everything needed to apply a study's model to new pixels.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub modality: String,
    /// Predictor order expected by the scaler and every model
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub models: Vec<FittedModel>,
    /// Name of the model used for prediction
    pub selected: String,
    /// Present for supervised studies
    pub label: Option<LabelBinning>,
    pub seed: u64,
}

impl ModelArtifact {
    pub fn model(&self, name: &str) -> Option<&FittedModel> {
        self.models.iter().find(|m| m.name() == name)
    }

    pub fn selected_model(&self) -> Result<&FittedModel> {
        self.model(&self.selected)
            .ok_or_else(|| Error::UnknownField(format!("model '{}'", self.selected)))
    }

    /// Fail unless `names` is exactly the training feature order
    pub fn check_features(&self, names: &[String]) -> Result<()> {
        if names != self.feature_names.as_slice() {
            return Err(Error::FeatureMismatch {
                expected: self.feature_names.clone(),
                found: names.to_vec(),
            });
        }
        Ok(())
    }

    /// Class of one raw (unscaled) feature row
    pub fn predict_row(&self, names: &[String], row: &[f64]) -> Result<usize> {
        self.check_features(names)?;
        let model = self.selected_model()?.as_classifier();
        let scaled = self.scaler.transform_row(row)?;
        model.predict_row(ArrayView1::from(&scaled))
    }

    /// Classify every cell of a layer stack with the selected model.
    ///
    /// Cells outside `mask` (row-major, when given) or with any non-finite
    /// feature are NaN.
    pub fn classify_stack(&self, stack: &LayerStack, mask: Option<&[bool]>) -> Result<Raster<f64>> {
        self.check_features(&stack.feature_names())?;
        let (rows, cols) = stack
            .shape()
            .ok_or_else(|| Error::DataAvailability("empty layer stack".into()))?;
        if let Some(m) = mask {
            if m.len() != rows * cols {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: m.len(),
                    ac: 1,
                });
            }
        }
        let model = self.selected_model()?.as_classifier();

        let cells: Vec<Option<Vec<f64>>> = (0..rows * cols)
            .into_par_iter()
            .map(|i| {
                if mask.is_some_and(|m| !m[i]) {
                    return None;
                }
                stack
                    .feature_vector_at(i / cols, i % cols)
                    .and_then(|v| self.scaler.transform_row(&v).ok())
            })
            .collect();
        let valid: Vec<usize> = (0..cells.len()).filter(|&i| cells[i].is_some()).collect();

        let mut data = vec![f64::NAN; rows * cols];
        if !valid.is_empty() {
            let flat: Vec<f64> = cells.into_iter().flatten().flatten().collect();
            let x = Array2::from_shape_vec((valid.len(), self.feature_names.len()), flat)
                .map_err(|e| Error::Other(e.to_string()))?;
            for (&i, class) in valid.iter().zip(model.predict(x.view())?) {
                data[i] = class as f64;
            }
        }

        let mut raster = Raster::from_vec(data, rows, cols)?;
        if let Some(t) = stack.transform() {
            raster.set_transform(t);
        }
        raster.set_nodata(Some(f64::NAN));
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{KnnParams, RandomForestParams};
    use glacis_core::GeoTransform;
    use ndarray::array;

    fn artifact() -> ModelArtifact {
        let x = array![[0.0, 0.0], [0.1, 0.2], [5.0, 5.0], [5.2, 4.9]];
        let y = [0, 0, 1, 1];
        let scaler = StandardScaler::fit(&x).unwrap();
        let z = scaler.transform(&x).unwrap();
        ModelArtifact {
            modality: "test".into(),
            feature_names: vec!["a".into(), "b".into()],
            scaler,
            models: vec![
                FittedModel::RandomForest(
                    RandomForest::fit(&z, &y, &RandomForestParams { n_trees: 5, ..Default::default() }).unwrap(),
                ),
                FittedModel::Knn(KnnClassifier::fit(&z, &y, &KnnParams { k: 1 }).unwrap()),
            ],
            selected: "knn".into(),
            label: None,
            seed: 42,
        }
    }

    #[test]
    fn rejects_reordered_features() {
        let a = artifact();
        let err = a.predict_row(&["b".to_string(), "a".to_string()], &[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::FeatureMismatch { .. }));
        assert_eq!(a.predict_row(&["a".to_string(), "b".to_string()], &[5.1, 5.0]).unwrap(), 1);
    }

    #[test]
    fn json_roundtrip_predicts_the_same() {
        let a = artifact();
        let text = serde_json::to_string(&a).unwrap();
        assert!(text.contains("\"kind\":\"random_forest\""));
        let back: ModelArtifact = serde_json::from_str(&text).unwrap();
        let names = a.feature_names.clone();
        for row in [[0.0, 0.1], [4.0, 4.5], [2.4, 2.6]] {
            assert_eq!(a.predict_row(&names, &row).unwrap(), back.predict_row(&names, &row).unwrap());
        }
    }

    #[test]
    fn classify_stack_masks_cells() {
        let a = artifact();
        let mut fa = Raster::filled(2, 2, 5.0);
        fa.set_transform(GeoTransform::new(79.0, 31.0, 0.01, -0.01));
        let mut fb = fa.clone();
        fb.set(0, 1, f64::NAN).unwrap();
        fb.set(1, 1, 0.0).unwrap();
        let mut stack = LayerStack::new();
        stack.push_feature("a", fa, &[]).unwrap();
        stack.push_feature("b", fb, &[]).unwrap();

        let mask = [true, true, false, true];
        let map = a.classify_stack(&stack, Some(&mask)).unwrap();
        assert_eq!(map.get(0, 0).unwrap(), 1.0);
        assert!(map.get(0, 1).unwrap().is_nan());
        assert!(map.get(1, 0).unwrap().is_nan());
        assert!(map.get(1, 1).unwrap().is_finite());
        assert_eq!(map.transform().origin_x, 79.0);
    }
}
