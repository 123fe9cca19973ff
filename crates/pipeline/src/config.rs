//! Study configuration.
//!
//! A [`StudyConfig`] holds the region, seed, output location and one
//! [`ModalityConfig`] per study. Defaults reproduce the Gangotri studies;
//! files in YAML or JSON override any subset of fields.

use std::path::{Path, PathBuf};

use glacis_algorithms::sampling::SamplingStrategy;
use glacis_cloud::{DateRange, OrbitDirection, Polarization, RetryPolicy, SceneFilter};
use chrono::NaiveDate;
use glacis_core::Region;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::modality::Modality;

/// A labelled acquisition window, e.g. `winter` or `2018`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    #[serde(flatten)]
    pub dates: DateRange,
}

/// Built-in window: label, first day, last day
type Window = (&'static str, NaiveDate, NaiveDate);

/// Date checked when the constant tables below are evaluated
const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid built-in date"),
    }
}

const DEM_WINDOWS: [Window; 2] = [
    ("srtm", ymd(2000, 2, 11), ymd(2000, 2, 22)),
    ("aster", ymd(2011, 1, 1), ymd(2011, 12, 31)),
];
const SENTINEL1_WINDOWS: [Window; 2] = [
    ("winter", ymd(2021, 1, 1), ymd(2021, 2, 28)),
    ("summer", ymd(2021, 6, 1), ymd(2021, 8, 31)),
];
const SENTINEL2_WINDOWS: [Window; 2] = [
    ("2018", ymd(2018, 6, 1), ymd(2019, 9, 30)),
    ("2023", ymd(2022, 6, 1), ymd(2023, 9, 30)),
];
const LANDSAT8_WINDOWS: [Window; 2] = [
    ("2017", ymd(2017, 6, 1), ymd(2017, 9, 30)),
    ("2023", ymd(2023, 6, 1), ymd(2023, 9, 30)),
];

fn periods(windows: &[Window]) -> Vec<Period> {
    windows
        .iter()
        .map(|&(label, start, end)| Period {
            label: label.to_string(),
            dates: DateRange { start, end },
        })
        .collect()
}

/// Settings for one modality study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityConfig {
    /// Exactly two windows: the baseline first, the comparison second
    pub periods: Vec<Period>,
    #[serde(default)]
    pub filter: SceneFilter,
    /// Sample cap
    pub samples: usize,
    #[serde(default)]
    pub sampling: SamplingStrategy,
    /// Quantile classes (supervised) or clusters (unsupervised)
    pub classes: usize,
}

/// Top-level configuration for all studies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub region: Region,
    pub seed: u64,
    pub output_dir: PathBuf,
    /// Held-out fraction for supervised evaluation
    pub test_fraction: f64,
    pub retry: RetryPolicy,
    pub dem: ModalityConfig,
    pub sentinel1: ModalityConfig,
    pub sentinel2: ModalityConfig,
    pub landsat8: ModalityConfig,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            region: Region::gangotri(),
            seed: 42,
            output_dir: PathBuf::from("output"),
            test_fraction: 0.2,
            retry: RetryPolicy::default(),
            dem: ModalityConfig {
                periods: periods(&DEM_WINDOWS),
                filter: SceneFilter::default(),
                samples: 2000,
                sampling: SamplingStrategy::Random,
                classes: 4,
            },
            sentinel1: ModalityConfig {
                periods: periods(&SENTINEL1_WINDOWS),
                filter: SceneFilter {
                    orbit: Some(OrbitDirection::Descending),
                    polarizations: vec![Polarization::VV, Polarization::VH],
                    instrument_mode: Some("IW".to_string()),
                    ..Default::default()
                },
                samples: 1000,
                sampling: SamplingStrategy::Random,
                classes: 3,
            },
            sentinel2: ModalityConfig {
                periods: periods(&SENTINEL2_WINDOWS),
                filter: SceneFilter {
                    max_cloud: Some(20.0),
                    ..Default::default()
                },
                samples: 1000,
                sampling: SamplingStrategy::Random,
                classes: 4,
            },
            landsat8: ModalityConfig {
                periods: periods(&LANDSAT8_WINDOWS),
                filter: SceneFilter {
                    max_cloud: Some(20.0),
                    ..Default::default()
                },
                samples: 1000,
                sampling: SamplingStrategy::Random,
                classes: 4,
            },
        }
    }
}

impl StudyConfig {
    /// Load from `.yaml`/`.yml` or `.json`, filling omitted fields with
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config: StudyConfig = match ext.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
            Some("json") => serde_json::from_str(&text)?,
            _ => {
                return Err(PipelineError::Config(format!(
                    "{}: expected a .yaml, .yml or .json file",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn modality(&self, modality: Modality) -> &ModalityConfig {
        match modality {
            Modality::Dem => &self.dem,
            Modality::Sentinel1 => &self.sentinel1,
            Modality::Sentinel2 => &self.sentinel2,
            Modality::Landsat8 => &self.landsat8,
        }
    }

    pub fn modality_mut(&mut self, modality: Modality) -> &mut ModalityConfig {
        match modality {
            Modality::Dem => &mut self.dem,
            Modality::Sentinel1 => &mut self.sentinel1,
            Modality::Sentinel2 => &mut self.sentinel2,
            Modality::Landsat8 => &mut self.landsat8,
        }
    }

    /// Output directory of one study
    pub fn study_dir(&self, modality: Modality) -> PathBuf {
        self.output_dir.join(modality.name())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.region.radius_m > 0.0) {
            return Err(PipelineError::Config(format!(
                "region radius must be positive, got {}",
                self.region.radius_m
            )));
        }
        if !(-180.0..=180.0).contains(&self.region.lon) || !(-90.0..=90.0).contains(&self.region.lat) {
            return Err(PipelineError::Config(format!(
                "region centre ({}, {}) is not a WGS84 coordinate",
                self.region.lon, self.region.lat
            )));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        for modality in Modality::ALL {
            let mc = self.modality(modality);
            let fail = |msg: String| PipelineError::Config(format!("{modality}: {msg}"));
            if mc.classes < 2 {
                return Err(fail(format!("classes must be at least 2, got {}", mc.classes)));
            }
            if mc.samples < 1 {
                return Err(fail("samples must be at least 1".into()));
            }
            if mc.periods.len() != 2 {
                return Err(fail(format!("expected 2 periods, got {}", mc.periods.len())));
            }
            for p in &mc.periods {
                if p.label.trim().is_empty() {
                    return Err(fail("period labels must not be empty".into()));
                }
                p.dates.validate().map_err(|e| fail(e.to_string()))?;
            }
            if mc.periods[0].label == mc.periods[1].label {
                return Err(fail(format!("period labels must differ, both are '{}'", mc.periods[0].label)));
            }
            mc.filter.validate().map_err(|e| fail(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_match_the_studies() {
        let c = StudyConfig::default();
        c.validate().unwrap();
        assert_eq!(c.seed, 42);
        assert_eq!(c.dem.samples, 2000);
        assert_eq!(c.sentinel1.classes, 3);
        assert_eq!(c.sentinel2.classes, 4);
        assert_eq!(c.sentinel2.filter.max_cloud, Some(20.0));
        assert_eq!(c.landsat8.periods[1].label, "2023");
        assert_eq!(c.dem.periods[0].dates.start.to_string(), "2000-02-11");
        assert_eq!(c.sentinel1.periods[0].dates.end.to_string(), "2021-02-28");
        assert_eq!(c.sentinel2.periods[1].dates, DateRange::parse("2022-06-01", "2023-09-30").unwrap());
        for m in Modality::ALL {
            for p in &c.modality(m).periods {
                p.dates.validate().unwrap();
            }
        }
        assert_eq!(c.study_dir(Modality::Sentinel1), PathBuf::from("output/sentinel1"));
    }

    #[test]
    fn partial_yaml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.yaml");
        std::fs::write(
            &path,
            "seed: 7\noutput_dir: runs\nsentinel1:\n  periods:\n    - {label: dry, start: 2020-01-01, end: 2020-02-28}\n    - {label: wet, start: 2020-07-01, end: 2020-08-31}\n  samples: 500\n  classes: 3\n",
        )
        .unwrap();
        let c = StudyConfig::load(&path).unwrap();
        assert_eq!(c.seed, 7);
        assert_eq!(c.output_dir, PathBuf::from("runs"));
        assert_eq!(c.sentinel1.periods[0].label, "dry");
        assert_eq!(c.sentinel1.samples, 500);
        // Filter omitted in the file falls back to "accept all"
        assert_eq!(c.sentinel1.filter, SceneFilter::default());
        assert_eq!(c.dem, StudyConfig::default().dem);
    }

    #[test]
    fn yaml_roundtrip_and_json_load() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = StudyConfig::default().to_yaml().unwrap();
        let back: StudyConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, StudyConfig::default());

        let path = dir.path().join("study.json");
        std::fs::write(&path, r#"{"test_fraction": 0.3, "region": {"name": "Test", "lon": 10.0, "lat": 46.0, "radius_m": 5000.0}}"#).unwrap();
        let c = StudyConfig::load(&path).unwrap();
        assert_eq!(c.test_fraction, 0.3);
        assert_eq!(c.region.name, "Test");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut c = StudyConfig::default();
        c.sentinel2.classes = 1;
        assert!(matches!(c.validate(), Err(PipelineError::Config(_))));

        let mut c = StudyConfig::default();
        c.test_fraction = 1.0;
        assert!(c.validate().is_err());

        let mut c = StudyConfig::default();
        c.region.radius_m = 0.0;
        assert!(c.validate().is_err());

        let mut c = StudyConfig::default();
        c.dem.samples = 0;
        assert!(c.validate().is_err());

        let mut c = StudyConfig::default();
        c.landsat8.periods.pop();
        assert!(c.validate().is_err());

        // start > end can only arrive through a file
        let mut c = StudyConfig::default();
        let p = &mut c.sentinel1.periods[0];
        std::mem::swap(&mut p.dates.start, &mut p.dates.end);
        assert!(c.validate().is_err());
    }

    #[test]
    fn unknown_extension_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");
        std::fs::write(&path, "seed = 1").unwrap();
        assert!(matches!(StudyConfig::load(&path), Err(PipelineError::Config(_))));
    }
}
