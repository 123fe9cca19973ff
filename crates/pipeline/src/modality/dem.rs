//! Terrain study: SRTM relief features, labelled by SRTM→ASTER elevation change

use std::collections::BTreeMap;

use glacis_algorithms::imagery::raster_difference;
use glacis_algorithms::terrain::{
    aspect, aspect_components, hillshade, slope, slope_classes, tpi, tri, AspectParams, GridUnits,
    HillshadeParams, SlopeParams, TpiParams, TriParams,
};
use glacis_core::LayerStack;

use super::{Aligner, LabelSource, Study, StudyData};
use crate::error::Result;

const ELEVATION: &str = "elevation";
pub(crate) const LABEL_FIELD: &str = "elev_change";
const CLASS_NAMES: [&str; 4] = [
    "major thinning",
    "moderate thinning",
    "slight change",
    "stable/thickening",
];

pub(crate) fn build(study: &Study<'_>) -> Result<StudyData> {
    let (base, later) = study.periods();
    let [base_collection, later_collection] = study.modality.collections();

    let srtm_composite = study.fetch(base_collection, base, &[ELEVATION])?;
    let aster_composite = study.fetch(later_collection, later, &[ELEVATION])?;

    let srtm = study.band(&srtm_composite, base_collection, ELEVATION)?;
    let aligner = Aligner::new(&srtm);
    let aster = aligner.align(study.band(&aster_composite, later_collection, ELEVATION)?);

    // Elevations are metres on a degree grid
    let grid = GridUnits::Geographic;
    let err = |e: glacis_core::Error| study.features_error(e);

    let slope_deg = slope(&srtm, SlopeParams { grid, ..Default::default() }).map_err(err)?;
    let aspect_deg = aspect(&srtm, AspectParams { grid, ..Default::default() }).map_err(err)?;
    let shade = hillshade(&srtm, HillshadeParams { grid, ..Default::default() }).map_err(err)?;
    let slope_class = slope_classes(&slope_deg).map_err(err)?;
    let (aspect_sin, aspect_cos) = aspect_components(&aspect_deg).map_err(err)?;
    let tpi_r = tpi(&srtm, TpiParams { radius: 1 }).map_err(err)?;
    let tri_r = tri(&srtm, TriParams { radius: 1 }).map_err(err)?;
    let elev_change = raster_difference(&srtm, &aster).map_err(err)?;

    let srtm_src = format!("{ELEVATION}_{}", base.label);
    let aster_src = format!("{ELEVATION}_{}", later.label);
    let from_srtm = [srtm_src.as_str()];

    let mut stack = LayerStack::new();
    let mut push = |name: &str, raster| stack.push_feature(name, raster, &from_srtm);
    push("slope", slope_deg).map_err(err)?;
    push("aspect", aspect_deg).map_err(err)?;
    push("hillshade", shade).map_err(err)?;
    push("slope_class", slope_class).map_err(err)?;
    push("aspect_sin", aspect_sin).map_err(err)?;
    push("aspect_cos", aspect_cos).map_err(err)?;
    push("tpi", tpi_r).map_err(err)?;
    push("tri", tri_r).map_err(err)?;
    stack
        .push_auxiliary(LABEL_FIELD, elev_change, &[srtm_src.as_str(), aster_src.as_str()])
        .map_err(err)?;

    Ok(StudyData {
        stack,
        scenes: BTreeMap::from([
            (base.label.clone(), srtm_composite.scene_count()),
            (later.label.clone(), aster_composite.scene_count()),
        ]),
        label: Some(LabelSource {
            field: LABEL_FIELD.to_string(),
            class_names: class_names(study.settings.classes),
        }),
    })
}

/// Named classes for the default 4-way split, generic names otherwise
fn class_names(k: usize) -> Vec<String> {
    if k == CLASS_NAMES.len() {
        CLASS_NAMES.iter().map(|s| s.to_string()).collect()
    } else {
        (0..k).map(|i| format!("{LABEL_FIELD} quantile {i}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classes_carry_thinning_names() {
        assert_eq!(class_names(4)[0], "major thinning");
        assert_eq!(class_names(3), vec!["elev_change quantile 0", "elev_change quantile 1", "elev_change quantile 2"]);
    }
}
