//! Integration tests against live STAC catalogs.
//!
//! All tests need network access and are `#[ignore]`d.
//! Run with: `cargo test -p glacis-cloud -- --ignored stac`

use glacis_cloud::{
    Collection, DateRange, ImageryProvider, ImageryRequest, SceneFilter, StacCatalog, StacClient,
    StacClientOptions, StacProvider, StacProviderOptions, StacSearchParams,
};
use glacis_core::Region;

/// Earth Search has Sentinel-2 L2A over Gangotri for summer 2023.
#[tokio::test]
#[ignore]
async fn stac_earth_search_sentinel2_gangotri() {
    let client = StacClient::new(StacCatalog::EarthSearch, StacClientOptions::default())
        .expect("failed to create client");
    let (w, s, e, n) = Region::gangotri().bbox();
    let params = StacSearchParams::new()
        .bbox(w, s, e, n)
        .datetime("2023-06-01T00:00:00Z/2023-09-30T23:59:59Z")
        .collections(&["sentinel-2-l2a"])
        .limit(10);

    let page = client.search(&params).await.expect("search failed");
    assert!(!page.is_empty(), "expected at least one item");
    for item in &page.features {
        assert!(item.date().is_some());
        assert!(item.asset("red").is_some(), "{} has no red asset", item.id);
    }
}

/// Planetary Computer asset signing appends a SAS token.
#[tokio::test]
#[ignore]
async fn stac_planetary_computer_signing() {
    let client = StacClient::new(StacCatalog::PlanetaryComputer, StacClientOptions::default())
        .expect("failed to create client");
    let (w, s, e, n) = Region::gangotri().bbox();
    let params = StacSearchParams::new()
        .bbox(w, s, e, n)
        .datetime("2021-06-01T00:00:00Z/2021-08-31T23:59:59Z")
        .collections(&["sentinel-1-rtc"])
        .limit(3);

    let page = client.search(&params).await.expect("search failed");
    let item = page.features.first().expect("no items");
    let href = &item.asset("vv").expect("no vv asset").href;
    let signed = client.sign_asset_href(href).await.expect("signing failed");
    assert!(signed.starts_with(href.as_str()));
    assert!(signed.contains("sig="));
}

/// Full provider path: search, filter, download, warp, composite.
#[test]
#[ignore]
fn stac_provider_sentinel1_composite() {
    let cache = tempfile::tempdir().unwrap();
    let provider = StacProvider::new(
        StacCatalog::PlanetaryComputer,
        StacProviderOptions {
            cache_dir: cache.path().to_path_buf(),
            max_items: 2,
            ..Default::default()
        },
    )
    .expect("failed to create provider");

    let region = Region::new("Gangotri snout", 79.08, 30.92, 2_000.0);
    let dates = DateRange::parse("2021-06-01", "2021-06-30").unwrap();
    let request = ImageryRequest::new(Collection::Sentinel1Grd, region, dates)
        .with_filter(SceneFilter::default());

    let composite = provider.composite(&request).expect("composite failed");
    assert!(composite.scene_count() >= 1);
    let vv = composite.band("VV").unwrap();
    assert!(vv.valid_count() > 0);
}
