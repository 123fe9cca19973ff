//! Thermal study: optical indices as predictors, labelled by LST change

use std::collections::BTreeMap;

use glacis_algorithms::imagery::{ndsi, ndvi, raster_difference};
use glacis_cloud::Collection;
use glacis_core::{LayerStack, Raster};

use super::{Aligner, LabelSource, Study, StudyData};
use crate::config::Period;
use crate::error::Result;

const GREEN: &str = "SR_B3";
const RED: &str = "SR_B4";
const NIR: &str = "SR_B5";
const SWIR: &str = "SR_B6";
const THERMAL: &str = "ST_B10";
pub(crate) const LABEL_FIELD: &str = "lst_change";

struct PeriodLayers {
    ndvi: Raster<f64>,
    ndsi: Raster<f64>,
    /// Land surface temperature, °C
    lst: Raster<f64>,
    scenes: usize,
}

pub(crate) fn build(study: &Study<'_>) -> Result<StudyData> {
    let (base, later) = study.periods();
    let [collection, _] = study.modality.collections();

    let first = period_layers(study, collection, base, None)?;
    let aligner = Aligner::new(&first.ndvi);
    let second = period_layers(study, collection, later, Some(&aligner))?;

    let err = |e: glacis_core::Error| study.features_error(e);
    let ndsi_change = raster_difference(&first.ndsi, &second.ndsi).map_err(err)?;
    let lst_change = raster_difference(&first.lst, &second.lst).map_err(err)?;

    let names = [
        format!("ndvi_{}", base.label),
        format!("ndsi_{}", base.label),
        format!("ndvi_{}", later.label),
        format!("ndsi_{}", later.label),
        format!("lst_{}", base.label),
        format!("lst_{}", later.label),
    ];
    let [ndvi_b, ndsi_b, ndvi_l, ndsi_l, lst_b, lst_l] = names.each_ref().map(String::as_str);

    let mut stack = LayerStack::new();
    stack.push_feature(ndvi_b, first.ndvi, &[]).map_err(err)?;
    stack.push_feature(ndsi_b, first.ndsi, &[]).map_err(err)?;
    stack.push_feature(ndvi_l, second.ndvi, &[]).map_err(err)?;
    stack.push_feature(ndsi_l, second.ndsi, &[]).map_err(err)?;
    stack.push_feature("ndsi_change", ndsi_change, &[ndsi_b, ndsi_l]).map_err(err)?;
    stack.push_auxiliary(lst_b, first.lst, &[]).map_err(err)?;
    stack.push_auxiliary(lst_l, second.lst, &[]).map_err(err)?;
    stack.push_auxiliary(LABEL_FIELD, lst_change, &[lst_b, lst_l]).map_err(err)?;

    let classes = study.settings.classes;
    Ok(StudyData {
        stack,
        scenes: BTreeMap::from([(base.label.clone(), first.scenes), (later.label.clone(), second.scenes)]),
        label: Some(LabelSource {
            field: LABEL_FIELD.to_string(),
            class_names: (0..classes).map(|i| format!("{LABEL_FIELD} quantile {i}")).collect(),
        }),
    })
}

fn period_layers(
    study: &Study<'_>,
    collection: Collection,
    period: &Period,
    aligner: Option<&Aligner>,
) -> Result<PeriodLayers> {
    let composite = study.fetch(collection, period, &[GREEN, RED, NIR, SWIR, THERMAL])?;
    let band = |name: &str| -> Result<Raster<f64>> {
        let r = study.band(&composite, collection, name)?;
        Ok(match aligner {
            Some(a) => a.align(r),
            None => r,
        })
    };
    let err = |e: glacis_core::Error| study.features_error(e);
    Ok(PeriodLayers {
        ndvi: ndvi(&band(NIR)?, &band(RED)?).map_err(err)?,
        ndsi: ndsi(&band(GREEN)?, &band(SWIR)?).map_err(err)?,
        lst: band(THERMAL)?,
        scenes: composite.scene_count(),
    })
}
