//! Optical study: NDVI/NDSI in two multi-year summer windows, clustered

use std::collections::BTreeMap;

use glacis_algorithms::imagery::{ndsi, ndvi, raster_difference};
use glacis_cloud::Collection;
use glacis_core::{LayerStack, Raster};

use super::{Aligner, Study, StudyData};
use crate::config::Period;
use crate::error::Result;

const GREEN: &str = "B3";
const RED: &str = "B4";
const NIR: &str = "B8";
const SWIR: &str = "B11";

pub(crate) fn build(study: &Study<'_>) -> Result<StudyData> {
    let (base, later) = study.periods();
    let [collection, _] = study.modality.collections();

    let (ndvi_base, ndsi_base, base_scenes) = indices(study, collection, base, None)?;
    let aligner = Aligner::new(&ndvi_base);
    let (ndvi_later, ndsi_later, later_scenes) = indices(study, collection, later, Some(&aligner))?;

    let err = |e: glacis_core::Error| study.features_error(e);
    let ndvi_change = raster_difference(&ndvi_base, &ndvi_later).map_err(err)?;
    let ndsi_change = raster_difference(&ndsi_base, &ndsi_later).map_err(err)?;

    let names = [
        format!("ndvi_{}", base.label),
        format!("ndsi_{}", base.label),
        format!("ndvi_{}", later.label),
        format!("ndsi_{}", later.label),
    ];
    let [ndvi_b, ndsi_b, ndvi_l, ndsi_l] = names.each_ref().map(String::as_str);

    let mut stack = LayerStack::new();
    stack.push_feature(ndvi_b, ndvi_base, &[]).map_err(err)?;
    stack.push_feature(ndsi_b, ndsi_base, &[]).map_err(err)?;
    stack.push_feature(ndvi_l, ndvi_later, &[]).map_err(err)?;
    stack.push_feature(ndsi_l, ndsi_later, &[]).map_err(err)?;
    stack.push_feature("ndvi_change", ndvi_change, &[ndvi_b, ndvi_l]).map_err(err)?;
    stack.push_feature("ndsi_change", ndsi_change, &[ndsi_b, ndsi_l]).map_err(err)?;

    Ok(StudyData {
        stack,
        scenes: BTreeMap::from([(base.label.clone(), base_scenes), (later.label.clone(), later_scenes)]),
        label: None,
    })
}

/// NDVI and NDSI of one period's reflectance composite
fn indices(
    study: &Study<'_>,
    collection: Collection,
    period: &Period,
    aligner: Option<&Aligner>,
) -> Result<(Raster<f64>, Raster<f64>, usize)> {
    let composite = study.fetch(collection, period, &[GREEN, RED, NIR, SWIR])?;
    let band = |name: &str| -> Result<Raster<f64>> {
        let r = study.band(&composite, collection, name)?;
        Ok(match aligner {
            Some(a) => a.align(r),
            None => r,
        })
    };
    let (green, red, nir, swir) = (band(GREEN)?, band(RED)?, band(NIR)?, band(SWIR)?);
    let err = |e: glacis_core::Error| study.features_error(e);
    Ok((
        ndvi(&nir, &red).map_err(err)?,
        ndsi(&green, &swir).map_err(err)?,
        composite.scene_count(),
    ))
}
