//! Imagery provider backed by a STAC API.
//!
//! Scenes are searched by bbox and date, filtered client-side on the EO,
//! SAT and SAR extension properties, downloaded whole into an
//! [`AssetCache`], cropped in the item's UTM zone and warped onto a WGS84
//! grid at the collection's resolution. Every item lands on the same grid,
//! so the median composite needs no further alignment.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use glacis_core::io::read_geotiff;
use glacis_core::Raster;
use tracing::{debug, info, warn};

use crate::cache::AssetCache;
use crate::collection::{ImageryRequest, StacMapping};
use crate::composite::{Composite, MedianCompositor};
use crate::error::{CloudError, Result};
use crate::provider::ImageryProvider;
use crate::reproject::{geographic_grid, warp_to_grid, Crs};
use crate::retry::RetryPolicy;
use crate::stac_client::{StacCatalog, StacClient, StacClientOptions};
use crate::stac_models::{StacItem, StacSearchParams};

/// Configuration for [`StacProvider`].
#[derive(Debug, Clone)]
pub struct StacProviderOptions {
    pub cache_dir: PathBuf,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Upper bound on items considered per request
    pub max_items: usize,
    /// Page size for search requests
    pub page_size: u32,
}

impl Default for StacProviderOptions {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".glacis-cache"),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            max_items: 200,
            page_size: 100,
        }
    }
}

/// Blocking [`ImageryProvider`] over a STAC catalog.
///
/// Owns a current-thread tokio runtime and blocks on it per request.
pub struct StacProvider {
    rt: tokio::runtime::Runtime,
    client: StacClient,
    cache: AssetCache,
    page_size: u32,
}

impl StacProvider {
    pub fn new(catalog: StacCatalog, options: StacProviderOptions) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let client = StacClient::new(
            catalog,
            StacClientOptions {
                request_timeout: options.request_timeout,
                retry: options.retry,
                max_items: options.max_items,
            },
        )?;
        Ok(Self {
            rt,
            client,
            cache: AssetCache::new(options.cache_dir),
            page_size: options.page_size,
        })
    }

    pub fn catalog(&self) -> &StacCatalog {
        self.client.catalog()
    }

    fn mapping(&self, request: &ImageryRequest) -> Result<StacMapping> {
        request
            .collection
            .stac_mapping(self.client.catalog())
            .ok_or_else(|| {
                CloudError::UnsupportedCollection(format!(
                    "{} on {}",
                    request.collection,
                    self.client.catalog().label()
                ))
            })
    }

    /// Items matching the request, after client-side filtering, ordered by
    /// acquisition date.
    pub fn search(&self, request: &ImageryRequest) -> Result<Vec<StacItem>> {
        request.validate()?;
        let mapping = self.mapping(request)?;
        let (w, s, e, n) = request.region.bbox();
        let params = StacSearchParams::new()
            .bbox(w, s, e, n)
            .datetime(&request.dates.to_stac_interval())
            .collections(&[mapping.collection])
            .limit(self.page_size);

        let found = self.rt.block_on(self.client.search_all(&params))?;
        let total = found.len();
        let mut items: Vec<StacItem> = found
            .into_iter()
            .filter(|item| match mapping.platform {
                Some(p) => item
                    .properties
                    .platform
                    .as_deref()
                    .is_some_and(|ip| ip.eq_ignore_ascii_case(p)),
                None => true,
            })
            .filter(|item| {
                let pols = item.polarizations();
                request.filter.accepts(&item.scene_properties(&pols))
            })
            .collect();
        items.sort_by(|a, b| a.date().cmp(&b.date()).then_with(|| a.id.cmp(&b.id)));
        info!(
            "{}: {} of {} {} items pass the scene filter",
            self.client.catalog().label(),
            items.len(),
            total,
            mapping.collection
        );
        Ok(items)
    }

    /// Requested bands of one item, warped onto the target grid.
    fn load_item(
        &self,
        item: &StacItem,
        request: &ImageryRequest,
        mapping: &StacMapping,
        grid: &(glacis_core::GeoTransform, usize, usize),
    ) -> Result<Option<BTreeMap<String, Raster<f64>>>> {
        let (target, rows, cols) = grid;
        let mut out = BTreeMap::new();
        for band in &request.bands {
            let key = mapping.asset_for(band).ok_or_else(|| {
                CloudError::UnsupportedCollection(format!("{} band {band}", request.collection))
            })?;
            let asset = item.asset(key).ok_or_else(|| {
                CloudError::Catalog(format!("item {} has no asset '{key}'", item.id))
            })?;
            let crs = match item.epsg(Some(key)) {
                None => Crs::Wgs84,
                Some(code) => Crs::from_epsg(code).ok_or_else(|| {
                    CloudError::Catalog(format!("item {} uses unsupported EPSG:{code}", item.id))
                })?,
            };

            let path = self.rt.block_on(self.cache.fetch(&self.client, &asset.href))?;
            let raster = read_geotiff::<f64, _>(&path)?.to_f64_masked();
            let bounds = crs.project_bbox(request.region.bbox());
            let Some(window) = raster
                .transform()
                .window_for_bounds(bounds, raster.cols(), raster.rows())
            else {
                return Ok(None);
            };
            let cropped = raster.crop(window)?;
            debug!("{} {band}: cropped to {}x{}", item.id, cropped.rows(), cropped.cols());
            out.insert(band.clone(), warp_to_grid(&cropped, crs, target, *rows, *cols));
        }
        Ok(Some(out))
    }
}

impl ImageryProvider for StacProvider {
    fn name(&self) -> &str {
        self.client.catalog().label()
    }

    fn composite(&self, request: &ImageryRequest) -> Result<Composite> {
        let mapping = self.mapping(request)?;
        let items = self.search(request)?;
        if items.is_empty() {
            return Err(request.no_imagery());
        }

        let grid = geographic_grid(request.region.bbox(), request.collection.resolution_m());
        let mut compositor = MedianCompositor::new();
        for item in &items {
            match self.load_item(item, request, &mapping, &grid)? {
                Some(bands) => compositor.add_scene(&item.id, bands),
                None => warn!("item {} does not cover {}, skipped", item.id, request.region.name),
            }
        }
        if compositor.is_empty() {
            return Err(request.no_imagery());
        }
        compositor.finish()
    }
}
