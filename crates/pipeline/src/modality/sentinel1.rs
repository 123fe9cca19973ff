//! SAR study: seasonal VV backscatter change, clustered

use std::collections::BTreeMap;

use glacis_algorithms::imagery::{polarization_difference, raster_difference};
use glacis_core::LayerStack;

use super::{Aligner, Study, StudyData};
use crate::error::Result;

const VV: &str = "VV";
const VH: &str = "VH";

pub(crate) fn build(study: &Study<'_>) -> Result<StudyData> {
    let (base, later) = study.periods();
    let [collection, _] = study.modality.collections();
    let bands = [VV, VH];

    let first = study.fetch(collection, base, &bands)?;
    let second = study.fetch(collection, later, &bands)?;

    let vv_base = study.band(&first, collection, VV)?;
    let aligner = Aligner::new(&vv_base);
    let vv_later = aligner.align(study.band(&second, collection, VV)?);
    let vh_later = aligner.align(study.band(&second, collection, VH)?);

    let err = |e: glacis_core::Error| study.features_error(e);
    let vv_change = raster_difference(&vv_base, &vv_later).map_err(err)?;
    let pol_diff = polarization_difference(&vv_later, &vh_later).map_err(err)?;

    let vv_base_name = format!("vv_{}", base.label);
    let vv_later_name = format!("vv_{}", later.label);
    let vh_later_name = format!("vh_{}", later.label);

    let mut stack = LayerStack::new();
    stack.push_feature(&vv_base_name, vv_base, &[]).map_err(err)?;
    stack.push_feature(&vv_later_name, vv_later, &[]).map_err(err)?;
    stack
        .push_feature("vv_change", vv_change, &[vv_base_name.as_str(), vv_later_name.as_str()])
        .map_err(err)?;
    stack.push_auxiliary(&vh_later_name, vh_later, &[]).map_err(err)?;
    stack
        .push_auxiliary(
            &format!("pol_diff_{}", later.label),
            pol_diff,
            &[vv_later_name.as_str(), vh_later_name.as_str()],
        )
        .map_err(err)?;

    Ok(StudyData {
        stack,
        scenes: BTreeMap::from([
            (base.label.clone(), first.scene_count()),
            (later.label.clone(), second.scene_count()),
        ]),
        label: None,
    })
}
