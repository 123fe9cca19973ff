//! Modeling stage shared by all studies
//!
//! Supervised studies bin an auxiliary column into quantile classes and fit
//! Random Forest, SVM and KNN on a stratified split. Unsupervised studies
//! cluster standardized samples with K-means. Both return a
//! [`ModelArtifact`] plus the class of every sample.

use std::collections::BTreeMap;

use glacis_algorithms::classification::{
    evaluate, kmeans, Classifier, FittedModel, KMeansParams, KnnClassifier, KnnParams, LabelBinning,
    ModelArtifact, RandomForest, RandomForestParams, StandardScaler, SvmClassifier, SvmParams,
    stratified_split,
};
use glacis_algorithms::labels::quantile_bins;
use glacis_core::{Error, SampleTable};
use ndarray::Axis;
use tracing::{debug, info};

use crate::error::{PipelineError, Result, Stage};
use crate::modality::{LabelSource, Modality};
use crate::report::{ClusterSummary, FeatureImportance, ModelSummary};

/// Fitted artifact, per-sample classes and the report section
#[derive(Debug)]
pub struct ModelFit {
    pub artifact: ModelArtifact,
    /// Label (supervised) or cluster (unsupervised) of each sample row
    pub classes: Vec<usize>,
    pub summary: ModelSummary,
}

/// Reject a label field that is a predictor or is derived from one.
pub fn check_leakage(table: &SampleTable, field: &str) -> glacis_core::Result<()> {
    if table.is_feature(field) {
        return Err(Error::Leakage {
            field: field.to_string(),
            reason: "the label field is also a predictor".into(),
        });
    }
    if let Some(feature) = table
        .feature_names()
        .iter()
        .find(|f| table.sources_of(field).contains(*f))
    {
        return Err(Error::Leakage {
            field: field.to_string(),
            reason: format!("derived from predictor '{feature}'"),
        });
    }
    Ok(())
}

/// Quantile labels, stratified split, train-only scaling and three
/// classifiers evaluated on the held-out rows.
pub fn fit_supervised(
    modality: Modality,
    table: &SampleTable,
    label: &LabelSource,
    k: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<ModelFit> {
    let at = |stage| move |e: Error| PipelineError::at(modality, stage, e);

    check_leakage(table, &label.field).map_err(at(Stage::Labels))?;
    let values = table.column(&label.field).map_err(at(Stage::Labels))?;
    if values.len() < 2 * k {
        return Err(PipelineError::at(
            modality,
            Stage::Labels,
            Error::DataAvailability(format!(
                "{} samples cannot fill {k} classes with 2 samples each",
                values.len()
            )),
        ));
    }
    let bins = quantile_bins(&values, k).map_err(at(Stage::Labels))?;
    debug!(%modality, edges = ?bins.edges, counts = ?bins.class_counts(), "quantile labels");

    let (train, test) = stratified_split(&bins.labels, test_fraction, seed).map_err(at(Stage::Modeling))?;
    let x = table.feature_matrix();
    let y = &bins.labels;
    let x_train = x.select(Axis(0), &train);
    let x_test = x.select(Axis(0), &test);
    let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
    let y_test: Vec<usize> = test.iter().map(|&i| y[i]).collect();

    let scaler = StandardScaler::fit(&x_train).map_err(at(Stage::Modeling))?;
    let x_train = scaler.transform(&x_train).map_err(at(Stage::Modeling))?;
    let x_test = scaler.transform(&x_test).map_err(at(Stage::Modeling))?;

    let rf = RandomForest::fit(
        &x_train,
        &y_train,
        &RandomForestParams {
            seed,
            ..Default::default()
        },
    )
    .map_err(at(Stage::Modeling))?;
    let svm = SvmClassifier::fit(&x_train, &y_train, &SvmParams::default()).map_err(at(Stage::Modeling))?;
    let knn = KnnClassifier::fit(&x_train, &y_train, &KnnParams::default()).map_err(at(Stage::Modeling))?;

    let importances = ranked_importances(table.feature_names(), &rf.feature_importances);
    let models = vec![
        FittedModel::RandomForest(rf),
        FittedModel::Svm(svm),
        FittedModel::Knn(knn),
    ];

    let mut metrics = BTreeMap::new();
    let mut best: Option<(&'static str, f64)> = None;
    for model in &models {
        let predicted = model.as_classifier().predict(x_test.view()).map_err(at(Stage::Modeling))?;
        let m = evaluate(&y_test, &predicted, k).map_err(at(Stage::Modeling))?;
        info!(%modality, model = model.name(), accuracy = m.accuracy, macro_f1 = m.macro_f1, "evaluated");
        // Strictly greater keeps the earlier model on ties
        if best.map_or(true, |(_, acc)| m.accuracy > acc) {
            best = Some((model.name(), m.accuracy));
        }
        metrics.insert(model.name().to_string(), m);
    }
    let selected = best.map_or("random_forest", |(name, _)| name).to_string();

    let artifact = ModelArtifact {
        modality: modality.to_string(),
        feature_names: table.feature_names().to_vec(),
        scaler,
        models,
        selected: selected.clone(),
        label: Some(LabelBinning {
            field: label.field.clone(),
            edges: bins.edges.clone(),
            class_names: label.class_names.clone(),
        }),
        seed,
    };

    let summary = ModelSummary::Supervised {
        label_field: label.field.clone(),
        class_names: label.class_names.clone(),
        edges: bins.edges.clone(),
        class_counts: bins.class_counts(),
        train_size: train.len(),
        test_size: test.len(),
        metrics,
        selected,
        feature_importances: importances,
    };

    Ok(ModelFit {
        artifact,
        classes: bins.labels,
        summary,
    })
}

/// Standardize every sample and cluster with K-means.
pub fn fit_unsupervised(modality: Modality, table: &SampleTable, k: usize, seed: u64) -> Result<ModelFit> {
    let at = |e: Error| PipelineError::at(modality, Stage::Modeling, e);

    let x = table.feature_matrix();
    if x.nrows() < k {
        return Err(at(Error::DataAvailability(format!(
            "{} samples are not enough for {k} clusters",
            x.nrows()
        ))));
    }
    let scaler = StandardScaler::fit(&x).map_err(at)?;
    let scaled = scaler.transform(&x).map_err(at)?;
    let fit = kmeans(
        &scaled,
        &KMeansParams {
            k,
            seed,
            ..Default::default()
        },
    )
    .map_err(at)?;
    info!(%modality, k, inertia = fit.model.inertia, iterations = fit.model.n_iter, "clustered");

    let sizes = fit.model.cluster_sizes(&fit.labels);
    let clusters = fit
        .model
        .centroids
        .iter()
        .zip(&sizes)
        .enumerate()
        .map(|(cluster, (centroid, &size))| {
            let original = scaler.inverse_transform_row(centroid)?;
            Ok(ClusterSummary {
                cluster,
                size,
                centroid: table.feature_names().iter().cloned().zip(original).collect(),
            })
        })
        .collect::<glacis_core::Result<Vec<_>>>()
        .map_err(at)?;

    let summary = ModelSummary::Unsupervised {
        k,
        clusters,
        inertia: fit.model.inertia,
        n_iter: fit.model.n_iter,
    };
    let selected = fit.model.name().to_string();
    let artifact = ModelArtifact {
        modality: modality.to_string(),
        feature_names: table.feature_names().to_vec(),
        scaler,
        models: vec![FittedModel::KMeans(fit.model)],
        selected,
        label: None,
        seed,
    };
    Ok(ModelFit {
        artifact,
        classes: fit.labels,
        summary,
    })
}

/// Pair importances with feature names, highest first
fn ranked_importances(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}
