//! Local GeoTIFF archive provider.
//!
//! An archive is a directory holding `catalog.json` and single-band
//! GeoTIFFs in WGS84 (EPSG:4326):
//!
//! ```json
//! { "scenes": [ {
//!     "id": "S1A_20210614",
//!     "collection": "sentinel1_grd",
//!     "date": "2021-06-14",
//!     "orbit": "descending",
//!     "polarizations": ["VV", "VH"],
//!     "instrument_mode": "IW",
//!     "bands": { "VV": "sentinel1_grd/S1A_20210614_VV.tif", "VH": "..." }
//! } ] }
//! ```
//!
//! Band paths are relative to the archive root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use glacis_core::io::{read_geotiff, write_geotiff};
use glacis_core::Raster;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collection::{Collection, ImageryRequest, OrbitDirection, Polarization, SceneProperties};
use crate::composite::{Composite, MedianCompositor};
use crate::error::{CloudError, Result};
use crate::provider::ImageryProvider;

pub const CATALOG_FILE: &str = "catalog.json";

/// One acquisition in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveScene {
    pub id: String,
    pub collection: Collection,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orbit: Option<OrbitDirection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polarizations: Vec<Polarization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_mode: Option<String>,
    /// Band name -> GeoTIFF path relative to the archive root
    #[serde(default)]
    pub bands: BTreeMap<String, PathBuf>,
}

impl ArchiveScene {
    pub fn new(id: impl Into<String>, collection: Collection, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            collection,
            date,
            cloud_cover: None,
            orbit: None,
            polarizations: Vec::new(),
            instrument_mode: None,
            bands: BTreeMap::new(),
        }
    }

    pub fn with_cloud_cover(mut self, percent: f64) -> Self {
        self.cloud_cover = Some(percent);
        self
    }

    /// SAR acquisition geometry
    pub fn with_sar(mut self, orbit: OrbitDirection, polarizations: &[Polarization], mode: &str) -> Self {
        self.orbit = Some(orbit);
        self.polarizations = polarizations.to_vec();
        self.instrument_mode = Some(mode.to_string());
        self
    }

    fn properties(&self) -> SceneProperties<'_> {
        SceneProperties {
            cloud_cover: self.cloud_cover,
            orbit: self.orbit,
            polarizations: &self.polarizations,
            instrument_mode: self.instrument_mode.as_deref(),
        }
    }
}

/// Contents of `catalog.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveCatalog {
    pub scenes: Vec<ArchiveScene>,
}

impl ArchiveCatalog {
    pub fn load(root: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(root.join(CATALOG_FILE))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        std::fs::create_dir_all(root)?;
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(root.join(CATALOG_FILE), text)?;
        Ok(())
    }
}

/// [`ImageryProvider`] over a directory of GeoTIFF scenes.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    root: PathBuf,
    catalog: ArchiveCatalog,
}

impl LocalArchive {
    /// Open an existing archive.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let catalog = ArchiveCatalog::load(&root).map_err(|e| {
            CloudError::Catalog(format!("cannot load {}: {e}", root.join(CATALOG_FILE).display()))
        })?;
        debug!("opened archive {} with {} scenes", root.display(), catalog.scenes.len());
        Ok(Self { root, catalog })
    }

    /// Start an empty archive at `root`, writing an empty catalog.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let catalog = ArchiveCatalog::default();
        catalog.save(&root)?;
        Ok(Self { root, catalog })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog(&self) -> &ArchiveCatalog {
        &self.catalog
    }

    /// Write a scene's bands as GeoTIFFs and record it in the catalog.
    pub fn insert_scene(&mut self, mut scene: ArchiveScene, bands: BTreeMap<String, Raster<f64>>) -> Result<()> {
        if self.catalog.scenes.iter().any(|s| s.id == scene.id) {
            return Err(CloudError::Catalog(format!("duplicate scene id '{}'", scene.id)));
        }
        for (band, raster) in bands {
            let rel = PathBuf::from(scene.collection.id()).join(format!("{}_{}.tif", scene.id, band));
            write_geotiff(&raster, self.root.join(&rel), None)?;
            scene.bands.insert(band, rel);
        }
        self.catalog.scenes.push(scene);
        self.catalog.save(&self.root)
    }

    /// Scenes passing the request's collection, date and scene filters, in
    /// date order.
    pub fn matching_scenes(&self, request: &ImageryRequest) -> Vec<&ArchiveScene> {
        let mut scenes: Vec<&ArchiveScene> = self
            .catalog
            .scenes
            .iter()
            .filter(|s| s.collection == request.collection)
            .filter(|s| request.dates.contains(s.date))
            .filter(|s| request.filter.accepts(&s.properties()))
            .collect();
        scenes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        scenes
    }

    /// Read the requested bands of a scene cropped to `bbox`, or `None` if
    /// the scene misses it.
    fn load_scene(
        &self,
        scene: &ArchiveScene,
        bands: &[String],
        bbox: (f64, f64, f64, f64),
    ) -> Result<Option<BTreeMap<String, Raster<f64>>>> {
        let (w, s, e, n) = bbox;
        let mut out = BTreeMap::new();
        for band in bands {
            let rel = scene.bands.get(band).ok_or_else(|| {
                CloudError::Catalog(format!("scene {} has no band '{band}'", scene.id))
            })?;
            let raster = read_geotiff::<f64, _>(self.root.join(rel))?.to_f64_masked();
            let Some(window) = raster
                .transform()
                .window_for_bounds((w, s, e, n), raster.cols(), raster.rows())
            else {
                return Ok(None);
            };
            out.insert(band.clone(), raster.crop(window)?);
        }
        Ok(Some(out))
    }
}

impl ImageryProvider for LocalArchive {
    fn name(&self) -> &str {
        "local-archive"
    }

    fn composite(&self, request: &ImageryRequest) -> Result<Composite> {
        request.validate()?;
        let scenes = self.matching_scenes(request);
        info!(
            "{}: {} scenes match {} {}",
            self.name(),
            scenes.len(),
            request.collection,
            request.dates
        );

        let bbox = request.region.bbox();
        let mut compositor = MedianCompositor::new();
        for scene in scenes {
            match self.load_scene(scene, &request.bands, bbox)? {
                Some(bands) => compositor.add_scene(&scene.id, bands),
                None => warn!("scene {} does not cover {}, skipped", scene.id, request.region.name),
            }
        }
        if compositor.is_empty() {
            return Err(request.no_imagery());
        }
        compositor.finish()
    }
}
