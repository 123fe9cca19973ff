//! Full study runs against generated LocalArchive fixtures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use glacis_cloud::{ArchiveScene, Collection, LocalArchive, OrbitDirection, Polarization};
use glacis_core::io::read_geotiff;
use glacis_core::region::haversine_m;
use glacis_core::{GeoTransform, Raster, Region};
use glacis_pipeline::persist::read_artifact;
use glacis_pipeline::{run_all, run_study, ModelSummary, Modality, StudyConfig};

const SIZE: usize = 120;
const CELL: f64 = 0.005;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// 0.6 degree tile over Gangotri with `f(lon, lat)` at every cell centre
fn tile(f: impl Fn(f64, f64) -> f64) -> Raster<f64> {
    let transform = GeoTransform::new(78.8, 31.3, CELL, -CELL);
    let mut r = Raster::filled(SIZE, SIZE, 0.0);
    r.set_transform(transform);
    for row in 0..SIZE {
        for col in 0..SIZE {
            let (lon, lat) = transform.pixel_to_geo(col, row);
            r.set(row, col, f(lon, lat)).unwrap();
        }
    }
    r
}

/// Distance from the glacier centre in metres
fn radius(lon: f64, lat: f64) -> f64 {
    let g = Region::gangotri();
    haversine_m(lon, lat, g.lon, g.lat)
}

/// Small deterministic texture
fn ripple(lon: f64, lat: f64) -> f64 {
    ((lon * 1500.0).sin() * (lat * 1700.0).cos()) * 0.3
}

fn config(out: &Path) -> StudyConfig {
    let mut c = StudyConfig::default();
    c.output_dir = out.to_path_buf();
    c.dem.samples = 400;
    c.sentinel1.samples = 300;
    c.sentinel2.samples = 300;
    c.landsat8.samples = 300;
    c
}

fn single(name: &str, raster: Raster<f64>) -> BTreeMap<String, Raster<f64>> {
    BTreeMap::from([(name.to_string(), raster)])
}

/// Bowl-shaped SRTM surface; ASTER thins more towards the rim.
fn dem_archive(dir: &Path, with_aster: bool) -> LocalArchive {
    let mut archive = LocalArchive::create(dir).unwrap();
    let srtm = |lon: f64, lat: f64| 4000.0 + radius(lon, lat).powi(2) / 40_000.0;
    archive
        .insert_scene(
            ArchiveScene::new("srtm_n30e079", Collection::Srtm, date("2000-02-15")),
            single("elevation", tile(srtm)),
        )
        .unwrap();
    if with_aster {
        let aster = move |lon: f64, lat: f64| srtm(lon, lat) - radius(lon, lat) / 500.0 + ripple(lon, lat);
        archive
            .insert_scene(
                ArchiveScene::new("astgtm_n30e079", Collection::AsterGdem, date("2011-06-01")),
                single("elevation", tile(aster)),
            )
            .unwrap();
    }
    archive
}

/// Linear power from dB
fn power(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Three longitude zones with distinct winter/summer VV behaviour
fn vv_db(lon: f64, summer: bool) -> f64 {
    match (lon < 79.03, lon < 79.13, summer) {
        (true, _, false) => -8.0,
        (true, _, true) => -20.0,
        (false, true, _) => -12.0,
        (false, false, false) => -10.0,
        (false, false, true) => -4.0,
    }
}

fn sar_archive(dir: &Path) -> LocalArchive {
    let mut archive = LocalArchive::create(dir).unwrap();
    let both = [Polarization::VV, Polarization::VH];
    for (id, day, orbit, summer) in [
        ("s1_w1", "2021-01-10", OrbitDirection::Descending, false),
        ("s1_w2", "2021-01-22", OrbitDirection::Descending, false),
        ("s1_s1", "2021-07-05", OrbitDirection::Descending, true),
        ("s1_s2", "2021-07-17", OrbitDirection::Descending, true),
        ("s1_asc", "2021-07-11", OrbitDirection::Ascending, true),
    ] {
        let outlier = if orbit == OrbitDirection::Ascending { 15.0 } else { 0.0 };
        let vv = tile(|lon, lat| power(vv_db(lon, summer) + ripple(lon, lat) + outlier));
        let vh = tile(|lon, lat| power(vv_db(lon, summer) - 6.0 + ripple(lon, lat)));
        let scene = ArchiveScene::new(id, Collection::Sentinel1Grd, date(day)).with_sar(orbit, &both, "IW");
        archive
            .insert_scene(scene, BTreeMap::from([("VV".to_string(), vv), ("VH".to_string(), vh)]))
            .unwrap();
    }
    archive
}

/// Sentinel-2 digital numbers for four surface types, one per quadrant
fn sentinel2_archive(dir: &Path) -> LocalArchive {
    let dn = |refl: f64| refl / 0.0001;
    let g = Region::gangotri();
    let (east_of, north_of) = (g.lon, g.lat);
    // Green, red, NIR and SWIR reflectance of each quadrant
    let surface = move |lon: f64, lat: f64, snow_green: f64| match (lon >= east_of, lat >= north_of) {
        (true, true) => [snow_green, 0.75, 0.70, 0.10],
        (false, true) => [0.30, 0.30, 0.32, 0.25],
        (false, false) => [0.08, 0.05, 0.45, 0.20],
        (true, false) => [0.20, 0.25, 0.30, 0.35],
    };
    let mut archive = LocalArchive::create(dir).unwrap();
    for (id, day, cloud, snow_green) in [
        ("s2_2018a", "2018-07-10", 5.0, 0.80),
        ("s2_2018b", "2018-08-14", 45.0, 0.95),
        ("s2_2023a", "2023-07-20", 3.0, 0.65),
    ] {
        let band = |i: usize| tile(move |lon, lat| dn(surface(lon, lat, snow_green)[i] + ripple(lon, lat) * 0.01));
        let bands = BTreeMap::from([
            ("B3".to_string(), band(0)),
            ("B4".to_string(), band(1)),
            ("B8".to_string(), band(2)),
            ("B11".to_string(), band(3)),
        ]);
        let scene = ArchiveScene::new(id, Collection::Sentinel2Msi, date(day)).with_cloud_cover(cloud);
        archive.insert_scene(scene, bands).unwrap();
    }
    archive
}

/// Landsat digital numbers for a snow core that shrinks between years
fn landsat_archive(dir: &Path) -> LocalArchive {
    let sr = |refl: f64| (refl + 0.2) / 0.000_027_5;
    let st = |celsius: f64| (celsius + 273.15 - 149.0) / 0.003_418_02;
    let mut archive = LocalArchive::create(dir).unwrap();
    for (id, day, cloud, snow_radius, warming) in [
        ("lc08_2017a", "2017-07-03", 4.0, 9_000.0, 0.0),
        ("lc08_2017b", "2017-08-04", 65.0, 0.0, 40.0),
        ("lc08_2023a", "2023-07-12", 8.0, 6_000.0, 1.0),
    ] {
        let snow = move |lon: f64, lat: f64| radius(lon, lat) < snow_radius;
        let band = |snow_refl: f64, rock_refl: f64| {
            tile(move |lon, lat| sr(if snow(lon, lat) { snow_refl } else { rock_refl } + ripple(lon, lat) * 0.01))
        };
        let lst = tile(move |lon, lat| {
            let base = if snow(lon, lat) { -5.0 } else { 8.0 };
            st(base + warming * (1.0 + radius(lon, lat) / 5_000.0))
        });
        let bands = BTreeMap::from([
            ("SR_B3".to_string(), band(0.65, 0.15)),
            ("SR_B4".to_string(), band(0.60, 0.18)),
            ("SR_B5".to_string(), band(0.55, 0.30)),
            ("SR_B6".to_string(), band(0.08, 0.28)),
            ("ST_B10".to_string(), lst),
        ]);
        let scene = ArchiveScene::new(id, Collection::Landsat8C2L2, date(day)).with_cloud_cover(cloud);
        archive.insert_scene(scene, bands).unwrap();
    }
    archive
}

#[test]
fn dem_study_classifies_elevation_change_from_terrain() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let archive = dem_archive(data.path(), true);

    let report = run_study(Modality::Dem, &archive, &config(out.path())).unwrap();

    assert_eq!(
        report.features,
        ["slope", "aspect", "hillshade", "slope_class", "aspect_sin", "aspect_cos", "tpi", "tri"]
    );
    assert_eq!(report.auxiliary, ["elev_change"]);
    assert_eq!(report.scenes, BTreeMap::from([("srtm".to_string(), 1), ("aster".to_string(), 1)]));
    assert_eq!(report.samples.drawn, 400);

    let ModelSummary::Supervised { metrics, class_counts, class_names, .. } = &report.model else {
        panic!("DEM study must be supervised");
    };
    assert_eq!(class_counts, &vec![100; 4]);
    assert_eq!(class_names[0], "major thinning");
    let rf = &metrics["random_forest"];
    assert_eq!(rf.confusion_matrix.len(), 4);
    assert!(rf.confusion_matrix.iter().all(|row| row.len() == 4));
    assert!(rf.accuracy > 0.25, "accuracy {}", rf.accuracy);

    for path in [
        &report.outputs.model,
        &report.outputs.report,
        &report.outputs.samples,
        &report.outputs.summary,
        &report.outputs.landcover,
    ] {
        assert!(path.exists(), "missing {}", path.display());
    }
    let artifact = read_artifact(&report.outputs.model).unwrap();
    assert_eq!(artifact.feature_names, report.features);
    assert!(!artifact.feature_names.iter().any(|f| f == "elev_change"));

    let map: Raster<f64> = read_geotiff(&report.outputs.landcover).unwrap();
    let classes: Vec<f64> = map.data().iter().copied().filter(|v| v.is_finite()).collect();
    assert!(!classes.is_empty());
    assert!(classes.iter().all(|&c| c >= 0.0 && c < 4.0 && c.fract() == 0.0));
    // Bounding-box corners lie outside the circular region
    assert!(map.get(0, 0).unwrap().is_nan());
}

#[test]
fn sar_study_finds_three_backscatter_regimes() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let archive = sar_archive(data.path());

    let report = run_study(Modality::Sentinel1, &archive, &config(out.path())).unwrap();

    assert_eq!(report.features, ["vv_winter", "vv_summer", "vv_change"]);
    assert_eq!(report.auxiliary, ["vh_summer", "pol_diff_summer"]);
    // The ascending pass is filtered out
    assert_eq!(report.scenes["summer"], 2);

    let ModelSummary::Unsupervised { k, clusters, .. } = &report.model else {
        panic!("SAR study must be unsupervised");
    };
    assert_eq!(*k, 3);
    assert!(clusters.iter().all(|c| c.size > 0));
    let mut summer: Vec<f64> = clusters.iter().map(|c| c.centroid["vv_summer"]).collect();
    summer.sort_by(f64::total_cmp);
    assert!(summer[1] - summer[0] > 3.0 && summer[2] - summer[1] > 3.0, "{summer:?}");
    assert!((summer[0] - (-20.0)).abs() < 1.0, "{summer:?}");
}

#[test]
fn fixed_seed_reruns_give_identical_models() {
    let data = tempfile::tempdir().unwrap();
    let archive = sar_archive(data.path());
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    let ra = run_study(Modality::Sentinel1, &archive, &config(a.path())).unwrap();
    let rb = run_study(Modality::Sentinel1, &archive, &config(b.path())).unwrap();
    assert_eq!(ra.model, rb.model);
    assert_eq!(fs::read(&ra.outputs.model).unwrap(), fs::read(&rb.outputs.model).unwrap());
    assert_eq!(
        fs::read_to_string(&ra.outputs.samples).unwrap(),
        fs::read_to_string(&rb.outputs.samples).unwrap()
    );
}

#[test]
fn optical_study_clusters_four_surface_types() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let archive = sentinel2_archive(data.path());

    let report = run_study(Modality::Sentinel2, &archive, &config(out.path())).unwrap();

    assert_eq!(
        report.features,
        ["ndvi_2018", "ndsi_2018", "ndvi_2023", "ndsi_2023", "ndvi_change", "ndsi_change"]
    );
    assert!(report.auxiliary.is_empty());
    // The 45 % cloudy scene is rejected by the < 20 % filter
    assert_eq!(report.scenes, BTreeMap::from([("2018".to_string(), 1), ("2023".to_string(), 1)]));

    let ModelSummary::Unsupervised { k, clusters, .. } = &report.model else {
        panic!("optical study must be unsupervised");
    };
    assert_eq!(*k, 4);
    assert_eq!(clusters.len(), 4);
    assert!(clusters.iter().all(|c| c.size > 0));
    let top = |field: &str| clusters.iter().map(|c| c.centroid[field]).fold(f64::NEG_INFINITY, f64::max);
    assert!(top("ndsi_2018") > 0.6, "snow cluster missing");
    assert!(top("ndvi_2018") > 0.6, "vegetation cluster missing");
    assert!(report.outputs.landcover.exists());
}

#[test]
fn landsat_study_labels_on_lst_change_without_using_it() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let archive = landsat_archive(data.path());

    let report = run_study(Modality::Landsat8, &archive, &config(out.path())).unwrap();

    assert_eq!(report.features, ["ndvi_2017", "ndsi_2017", "ndvi_2023", "ndsi_2023", "ndsi_change"]);
    assert_eq!(report.auxiliary, ["lst_2017", "lst_2023", "lst_change"]);
    // The 65 % cloudy scene is rejected by the < 20 % filter
    assert_eq!(report.scenes["2017"], 1);
    let ModelSummary::Supervised { label_field, metrics, edges, .. } = &report.model else {
        panic!("thermal study must be supervised");
    };
    assert_eq!(label_field, "lst_change");
    assert_eq!(metrics.len(), 3);
    assert_eq!(edges.len(), 5);
    assert!(edges.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn missing_aster_is_a_data_availability_error() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let archive = dem_archive(data.path(), false);

    let err = run_study(Modality::Dem, &archive, &config(out.path())).unwrap_err();
    assert!(err.is_data_availability(), "{err}");
    assert!(err.to_string().contains("widening the date range"));
    assert!(!out.path().join("dem").exists());
}

#[test]
fn run_all_continues_past_failed_studies() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let archive = sar_archive(data.path());

    let outcomes = run_all(&archive, &config(out.path()));
    let ok: Vec<Modality> = outcomes.iter().filter(|(_, r)| r.is_ok()).map(|(m, _)| *m).collect();
    assert_eq!(ok, [Modality::Sentinel1]);
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes
        .iter()
        .filter(|(m, _)| *m != Modality::Sentinel1)
        .all(|(_, r)| r.as_ref().is_err_and(|e| e.is_data_availability())));
}
