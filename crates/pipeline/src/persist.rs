//! Writing study outputs
//!
//! Each run overwrites the files under `<output_dir>/<modality>/`.

use std::fs;
use std::path::Path;

use glacis_algorithms::classification::ModelArtifact;
use glacis_core::io::{write_geotiff, write_samples_csv, GeoTiffOptions};
use glacis_core::{Raster, SampleTable};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::report::{ModelSummary, OutputPaths, RunReport};

/// File layout of one study directory
pub fn output_paths(dir: &Path) -> OutputPaths {
    OutputPaths {
        model: dir.join("model.json"),
        report: dir.join("report.json"),
        samples: dir.join("samples.csv"),
        summary: dir.join("summary.csv"),
        landcover: dir.join("landcover.tif"),
    }
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), "wrote JSON");
    Ok(())
}

pub fn write_artifact(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    write_json(artifact, path)
}

/// Read a `model.json` written by [`write_artifact`].
pub fn read_artifact(path: &Path) -> Result<ModelArtifact> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    write_json(report, path)
}

/// Sample rows with their class column
pub fn write_samples(table: &SampleTable, classes: &[usize], path: &Path) -> Result<()> {
    write_samples_csv(table, Some(classes), path)?;
    Ok(())
}

/// Land-cover map as a WGS84 GeoTIFF with NaN nodata
pub fn write_landcover(map: &Raster<f64>, path: &Path) -> Result<()> {
    write_geotiff(map, path, Some(GeoTiffOptions::default()))?;
    Ok(())
}

/// Flat view of the model summary.
///
/// Supervised: `model,class,precision,recall,f1,support`. Unsupervised:
/// `cluster,size` followed by one centroid column per feature.
pub fn write_summary_csv(summary: &ModelSummary, features: &[String], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    match summary {
        ModelSummary::Supervised {
            metrics, class_names, ..
        } => {
            writer.write_record(["model", "class", "precision", "recall", "f1", "support"])?;
            for (model, m) in metrics {
                for (i, score) in m.per_class.iter().enumerate() {
                    let class = class_names.get(i).cloned().unwrap_or_else(|| i.to_string());
                    writer.write_record([
                        model.clone(),
                        class,
                        format!("{:.4}", score.precision),
                        format!("{:.4}", score.recall),
                        format!("{:.4}", score.f1),
                        score.support.to_string(),
                    ])?;
                }
            }
        }
        ModelSummary::Unsupervised { clusters, .. } => {
            let mut header = vec!["cluster".to_string(), "size".to_string()];
            header.extend(features.iter().cloned());
            writer.write_record(&header)?;
            for c in clusters {
                let mut record = vec![c.cluster.to_string(), c.size.to_string()];
                record.extend(
                    features
                        .iter()
                        .map(|f| c.centroid.get(f).map_or_else(String::new, |v| format!("{v:.6}"))),
                );
                writer.write_record(&record)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ClusterSummary;
    use std::collections::BTreeMap;

    #[test]
    fn layout_is_fixed_per_directory() {
        let paths = output_paths(Path::new("output/dem"));
        assert_eq!(paths.model, Path::new("output/dem/model.json"));
        assert_eq!(paths.landcover, Path::new("output/dem/landcover.tif"));
    }

    #[test]
    fn cluster_summary_csv_has_one_row_per_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/summary.csv");
        let features = vec!["vv_winter".to_string(), "vv_summer".to_string()];
        let summary = ModelSummary::Unsupervised {
            k: 2,
            clusters: (0..2)
                .map(|i| ClusterSummary {
                    cluster: i,
                    size: 10 + i,
                    centroid: BTreeMap::from([
                        ("vv_winter".to_string(), -12.5 + i as f64),
                        ("vv_summer".to_string(), -18.0),
                    ]),
                })
                .collect(),
            inertia: 3.5,
            n_iter: 4,
        };
        write_summary_csv(&summary, &features, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "cluster,size,vv_winter,vv_summer");
        assert_eq!(lines[2], "1,11,-11.500000,-18.000000");
        assert_eq!(lines.len(), 3);
    }
}
