//! LocalArchive end-to-end: GeoTIFF fixtures, filtering, cropping, median.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use glacis_cloud::{
    ArchiveScene, CloudError, Collection, DateRange, ImageryProvider, ImageryRequest, LocalArchive,
    OrbitDirection, Polarization, SceneFilter,
};
use glacis_core::{GeoTransform, Raster, Region};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// 0.5 x 0.5 degree tile around Gangotri at 0.01 degree spacing
fn tile(value: f64) -> Raster<f64> {
    let mut r = Raster::filled(50, 50, value);
    r.set_transform(GeoTransform::new(78.8, 31.2, 0.01, -0.01));
    r
}

fn sar_bands(vv: f64, vh: f64) -> BTreeMap<String, Raster<f64>> {
    BTreeMap::from([("VV".to_string(), tile(vv)), ("VH".to_string(), tile(vh))])
}

fn sar_archive(dir: &std::path::Path) -> LocalArchive {
    let mut archive = LocalArchive::create(dir).unwrap();
    let both = [Polarization::VV, Polarization::VH];
    let s1 = Collection::Sentinel1Grd;
    for (id, day, orbit, vv) in [
        ("s1_a", "2021-06-05", OrbitDirection::Descending, 0.10),
        ("s1_b", "2021-06-17", OrbitDirection::Descending, 0.30),
        ("s1_c", "2021-06-29", OrbitDirection::Descending, 0.20),
        ("s1_asc", "2021-06-11", OrbitDirection::Ascending, 9.0),
    ] {
        let scene = ArchiveScene::new(id, s1, date(day)).with_sar(orbit, &both, "IW");
        archive.insert_scene(scene, sar_bands(vv, vv / 5.0)).unwrap();
    }
    archive
}

fn summer_request() -> ImageryRequest {
    let dates = DateRange::parse("2021-06-01", "2021-08-31").unwrap();
    ImageryRequest::new(Collection::Sentinel1Grd, Region::gangotri(), dates).with_filter(SceneFilter {
        orbit: Some(OrbitDirection::Descending),
        polarizations: vec![Polarization::VV, Polarization::VH],
        instrument_mode: Some("IW".into()),
        ..Default::default()
    })
}

#[test]
fn composite_is_median_of_filtered_scenes_cropped_to_region() {
    let dir = tempfile::tempdir().unwrap();
    sar_archive(dir.path());
    let archive = LocalArchive::open(dir.path()).unwrap();

    let composite = archive.composite(&summer_request()).unwrap();
    assert_eq!(composite.scene_ids, vec!["s1_a", "s1_b", "s1_c"]);

    let vv = composite.band("VV").unwrap();
    let vh = composite.band("VH").unwrap();
    assert_eq!(vv.shape(), vh.shape());

    // Cropped to the ~0.35 x 0.27 degree region bbox, not the whole tile
    let (rows, cols) = vv.shape();
    assert!(rows < 50 && cols < 50, "got {rows}x{cols}");
    let (w, s, e, n) = Region::gangotri().bbox();
    let (x0, y0, x1, y1) = vv.bounds();
    assert!(x0 <= w && y0 <= s && x1 >= e && y1 >= n);

    // The ascending outlier never enters the median
    assert!((vv.get(rows / 2, cols / 2).unwrap() - 0.20).abs() < 1e-6);
    assert!((vh.get(0, 0).unwrap() - 0.04).abs() < 1e-6);
}

#[test]
fn empty_window_is_no_imagery() {
    let dir = tempfile::tempdir().unwrap();
    let archive = sar_archive(dir.path());

    let mut winter = summer_request();
    winter.dates = DateRange::parse("2021-01-01", "2021-02-28").unwrap();
    match archive.composite(&winter) {
        Err(CloudError::NoImagery { collection, .. }) => assert_eq!(collection, "sentinel1_grd"),
        other => panic!("expected NoImagery, got {other:?}"),
    }
}

#[test]
fn scenes_outside_region_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut archive = LocalArchive::create(dir.path()).unwrap();
    let mut far = Raster::filled(10, 10, 100.0);
    far.set_transform(GeoTransform::new(10.0, 50.0, 0.01, -0.01));
    archive
        .insert_scene(
            ArchiveScene::new("srtm_far", Collection::Srtm, date("2000-02-15")),
            BTreeMap::from([("elevation".to_string(), far)]),
        )
        .unwrap();

    let dates = DateRange::parse("2000-02-11", "2000-02-22").unwrap();
    let req = ImageryRequest::new(Collection::Srtm, Region::gangotri(), dates);
    assert!(matches!(archive.composite(&req), Err(CloudError::NoImagery { .. })));
}

#[test]
fn missing_band_is_a_catalog_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut archive = LocalArchive::create(dir.path()).unwrap();
    archive
        .insert_scene(
            ArchiveScene::new("s2_only_red", Collection::Sentinel2Msi, date("2018-07-01")).with_cloud_cover(3.0),
            BTreeMap::from([("B4".to_string(), tile(1200.0))]),
        )
        .unwrap();

    let dates = DateRange::parse("2018-06-01", "2019-09-30").unwrap();
    let req = ImageryRequest::new(Collection::Sentinel2Msi, Region::gangotri(), dates).with_bands(&["B4", "B8"]);
    assert!(matches!(archive.composite(&req), Err(CloudError::Catalog(_))));
}
