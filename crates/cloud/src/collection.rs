//! Imagery collections and acquisition requests.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use glacis_core::Region;
use serde::{Deserialize, Serialize};

use crate::error::{CloudError, Result};
use crate::stac_client::StacCatalog;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Satellite products the studies draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    /// SRTM 30 m DEM (February 2000)
    #[serde(rename = "srtm")]
    Srtm,
    /// ASTER GDEM v3 (2011)
    #[serde(rename = "aster_gdem")]
    AsterGdem,
    /// Sentinel-1 C-band SAR, ground range detected
    #[serde(rename = "sentinel1_grd")]
    Sentinel1Grd,
    /// Sentinel-2 MSI surface reflectance
    #[serde(rename = "sentinel2_msi")]
    Sentinel2Msi,
    /// Landsat 8 Collection 2 Level 2
    #[serde(rename = "landsat8_c2l2")]
    Landsat8C2L2,
}

/// How stored band values map to physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueScale {
    /// Already in physical units (metres for DEMs)
    Identity,
    /// `value * scale + offset`
    Linear { scale: f64, offset: f64 },
    /// Linear backscatter power, converted to dB by the caller
    LinearPower,
}

/// Where a collection lives in a STAC catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct StacMapping {
    pub collection: &'static str,
    /// `(band, asset key)` pairs
    pub assets: &'static [(&'static str, &'static str)],
    /// Client-side `platform` filter, when the STAC collection mixes missions
    pub platform: Option<&'static str>,
}

impl StacMapping {
    /// Asset key holding `band`
    pub fn asset_for(&self, band: &str) -> Option<&'static str> {
        self.assets.iter().find(|(b, _)| *b == band).map(|(_, a)| *a)
    }
}

const NASADEM_ASSETS: &[(&str, &str)] = &[("elevation", "elevation")];
const S1_RTC_ASSETS: &[(&str, &str)] = &[("VV", "vv"), ("VH", "vh")];
const S2_PC_ASSETS: &[(&str, &str)] = &[
    ("B2", "B02"),
    ("B3", "B03"),
    ("B4", "B04"),
    ("B8", "B08"),
    ("B11", "B11"),
];
const S2_ES_ASSETS: &[(&str, &str)] = &[
    ("B2", "blue"),
    ("B3", "green"),
    ("B4", "red"),
    ("B8", "nir"),
    ("B11", "swir16"),
];
const LANDSAT_ASSETS: &[(&str, &str)] = &[
    ("SR_B2", "blue"),
    ("SR_B3", "green"),
    ("SR_B4", "red"),
    ("SR_B5", "nir08"),
    ("SR_B6", "swir16"),
    ("ST_B10", "lwir11"),
];

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Srtm,
        Collection::AsterGdem,
        Collection::Sentinel1Grd,
        Collection::Sentinel2Msi,
        Collection::Landsat8C2L2,
    ];

    /// Short identifier, as used in archive catalogs and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            Self::Srtm => "srtm",
            Self::AsterGdem => "aster_gdem",
            Self::Sentinel1Grd => "sentinel1_grd",
            Self::Sentinel2Msi => "sentinel2_msi",
            Self::Landsat8C2L2 => "landsat8_c2l2",
        }
    }

    /// Band names available from this collection
    pub fn bands(&self) -> &'static [&'static str] {
        match self {
            Self::Srtm | Self::AsterGdem => &["elevation"],
            Self::Sentinel1Grd => &["VV", "VH"],
            Self::Sentinel2Msi => &["B2", "B3", "B4", "B8", "B11"],
            Self::Landsat8C2L2 => &["SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B6", "ST_B10"],
        }
    }

    pub fn has_band(&self, band: &str) -> bool {
        self.bands().contains(&band)
    }

    /// Nominal ground resolution in metres
    pub fn resolution_m(&self) -> f64 {
        match self {
            Self::Srtm | Self::AsterGdem | Self::Landsat8C2L2 => 30.0,
            Self::Sentinel1Grd | Self::Sentinel2Msi => 10.0,
        }
    }

    /// Whether scenes carry a meaningful cloud-cover property
    pub fn is_optical(&self) -> bool {
        matches!(self, Self::Sentinel2Msi | Self::Landsat8C2L2)
    }

    /// Scaling from stored values to physical units for `band`
    pub fn value_scale(&self, band: &str) -> ValueScale {
        match self {
            Self::Srtm | Self::AsterGdem => ValueScale::Identity,
            Self::Sentinel1Grd => ValueScale::LinearPower,
            Self::Sentinel2Msi => ValueScale::Linear {
                scale: 0.0001,
                offset: 0.0,
            },
            Self::Landsat8C2L2 if band.starts_with("ST_") => ValueScale::Linear {
                scale: 0.003_418_02,
                offset: 149.0 - 273.15,
            },
            Self::Landsat8C2L2 => ValueScale::Linear {
                scale: 0.000_027_5,
                offset: -0.2,
            },
        }
    }

    /// STAC collection and asset keys in `catalog`, if it serves this product.
    ///
    /// Custom endpoints are assumed to follow Earth Search naming.
    pub fn stac_mapping(&self, catalog: &StacCatalog) -> Option<StacMapping> {
        let pc = matches!(catalog, StacCatalog::PlanetaryComputer);
        match self {
            Self::Srtm if pc => Some(StacMapping {
                collection: "nasadem",
                assets: NASADEM_ASSETS,
                platform: None,
            }),
            Self::Sentinel1Grd if pc => Some(StacMapping {
                collection: "sentinel-1-rtc",
                assets: S1_RTC_ASSETS,
                platform: None,
            }),
            Self::Sentinel2Msi => Some(StacMapping {
                collection: "sentinel-2-l2a",
                assets: if pc { S2_PC_ASSETS } else { S2_ES_ASSETS },
                platform: None,
            }),
            Self::Landsat8C2L2 => Some(StacMapping {
                collection: "landsat-c2-l2",
                assets: LANDSAT_ASSETS,
                platform: Some("landsat-8"),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Collection {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "srtm" => Ok(Self::Srtm),
            "aster" | "aster_gdem" => Ok(Self::AsterGdem),
            "s1" | "sentinel1" | "sentinel1_grd" => Ok(Self::Sentinel1Grd),
            "s2" | "sentinel2" | "sentinel2_msi" => Ok(Self::Sentinel2Msi),
            "l8" | "landsat8" | "landsat8_c2l2" => Ok(Self::Landsat8C2L2),
            other => Err(CloudError::InvalidRequest(format!("unknown collection '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Dates and scene filters
// ---------------------------------------------------------------------------

/// Inclusive acquisition date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Build from `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| CloudError::InvalidRequest(format!("bad date '{s}': {e}")))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(CloudError::InvalidRequest(format!(
                "date range starts after it ends ({} > {})",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// RFC 3339 interval covering whole days, as STAC `datetime` expects
    pub fn to_stac_interval(&self) -> String {
        format!("{}T00:00:00Z/{}T23:59:59Z", self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// SAR pass direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrbitDirection {
    Ascending,
    Descending,
}

impl FromStr for OrbitDirection {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ascending" => Ok(Self::Ascending),
            "descending" => Ok(Self::Descending),
            other => Err(CloudError::InvalidRequest(format!("unknown orbit direction '{other}'"))),
        }
    }
}

/// SAR polarization channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HH,
    HV,
}

impl FromStr for Polarization {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Self::VV),
            "VH" => Ok(Self::VH),
            "HH" => Ok(Self::HH),
            "HV" => Ok(Self::HV),
            other => Err(CloudError::InvalidRequest(format!("unknown polarization '{other}'"))),
        }
    }
}

/// Scene-level filter. Unset fields accept everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneFilter {
    /// Keep scenes with cloud cover strictly below this percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cloud: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbit: Option<OrbitDirection>,
    /// Every listed polarization must be present
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub polarizations: Vec<Polarization>,
    /// SAR instrument mode, e.g. `IW`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_mode: Option<String>,
}

/// Scene properties a filter inspects
#[derive(Debug, Clone, Default)]
pub struct SceneProperties<'a> {
    pub cloud_cover: Option<f64>,
    pub orbit: Option<OrbitDirection>,
    pub polarizations: &'a [Polarization],
    pub instrument_mode: Option<&'a str>,
}

impl SceneFilter {
    /// Whether a scene passes. A constrained property that the scene does
    /// not report fails the filter.
    pub fn accepts(&self, scene: &SceneProperties<'_>) -> bool {
        if let Some(max) = self.max_cloud {
            match scene.cloud_cover {
                Some(cc) if cc < max => {}
                _ => return false,
            }
        }
        if let Some(orbit) = self.orbit {
            if scene.orbit != Some(orbit) {
                return false;
            }
        }
        if !self.polarizations.iter().all(|p| scene.polarizations.contains(p)) {
            return false;
        }
        if let Some(mode) = &self.instrument_mode {
            if !scene.instrument_mode.is_some_and(|m| m.eq_ignore_ascii_case(mode)) {
                return false;
            }
        }
        true
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_cloud {
            if !(0.0..=100.0).contains(&max) {
                return Err(CloudError::InvalidRequest(format!(
                    "max_cloud must be a percentage, got {max}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One composite to fetch: collection, place, time window and scene filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageryRequest {
    pub collection: Collection,
    pub region: Region,
    pub dates: DateRange,
    pub filter: SceneFilter,
    pub bands: Vec<String>,
}

impl ImageryRequest {
    /// Request every band of `collection` with no scene filter.
    pub fn new(collection: Collection, region: Region, dates: DateRange) -> Self {
        Self {
            collection,
            region,
            dates,
            filter: SceneFilter::default(),
            bands: collection.bands().iter().map(|b| b.to_string()).collect(),
        }
    }

    pub fn with_filter(mut self, filter: SceneFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_bands(mut self, bands: &[&str]) -> Self {
        self.bands = bands.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.dates.validate()?;
        self.filter.validate()?;
        if !(self.region.radius_m > 0.0) {
            return Err(CloudError::InvalidRequest(format!(
                "region radius must be positive, got {}",
                self.region.radius_m
            )));
        }
        if self.bands.is_empty() {
            return Err(CloudError::InvalidRequest("no bands requested".into()));
        }
        if let Some(bad) = self.bands.iter().find(|b| !self.collection.has_band(b)) {
            return Err(CloudError::InvalidRequest(format!(
                "{} has no band '{bad}'",
                self.collection
            )));
        }
        Ok(())
    }

    pub(crate) fn no_imagery(&self) -> CloudError {
        CloudError::NoImagery {
            collection: self.collection.to_string(),
            region: self.region.name.clone(),
            start: self.dates.start.to_string(),
            end: self.dates.end.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn date_range_validation() {
        assert!(DateRange::parse("2021-01-01", "2021-02-28").is_ok());
        assert!(DateRange::parse("2021-03-01", "2021-02-28").is_err());
        assert!(DateRange::parse("2021-13-01", "2021-12-31").is_err());

        let r = DateRange::parse("2000-02-11", "2000-02-22").unwrap();
        assert!(r.contains(d("2000-02-11")));
        assert!(r.contains(d("2000-02-22")));
        assert!(!r.contains(d("2000-02-23")));
        assert_eq!(r.to_stac_interval(), "2000-02-11T00:00:00Z/2000-02-22T23:59:59Z");
    }

    #[test]
    fn cloud_filter_is_strict_and_requires_property() {
        let f = SceneFilter {
            max_cloud: Some(20.0),
            ..Default::default()
        };
        let scene = |cc| SceneProperties {
            cloud_cover: cc,
            ..Default::default()
        };
        assert!(f.accepts(&scene(Some(5.0))));
        assert!(!f.accepts(&scene(Some(20.0))));
        assert!(!f.accepts(&scene(None)));
    }

    #[test]
    fn sar_filter_checks_orbit_polarizations_and_mode() {
        let f = SceneFilter {
            orbit: Some(OrbitDirection::Descending),
            polarizations: vec![Polarization::VV, Polarization::VH],
            instrument_mode: Some("IW".into()),
            ..Default::default()
        };
        let both = [Polarization::VV, Polarization::VH];
        let ok = SceneProperties {
            orbit: Some(OrbitDirection::Descending),
            polarizations: &both,
            instrument_mode: Some("iw"),
            ..Default::default()
        };
        assert!(f.accepts(&ok));

        let vv_only = [Polarization::VV];
        assert!(!f.accepts(&SceneProperties { polarizations: &vv_only, ..ok.clone() }));
        assert!(!f.accepts(&SceneProperties { orbit: Some(OrbitDirection::Ascending), ..ok.clone() }));
        assert!(!f.accepts(&SceneProperties { instrument_mode: Some("EW"), ..ok }));
    }

    #[test]
    fn request_rejects_unknown_band() {
        let dates = DateRange::parse("2021-01-01", "2021-02-28").unwrap();
        let req = ImageryRequest::new(Collection::Sentinel1Grd, Region::gangotri(), dates);
        assert!(req.validate().is_ok());
        assert!(req.clone().with_bands(&["B4"]).validate().is_err());
        assert!(req.with_bands(&[]).validate().is_err());
    }

    #[test]
    fn collection_names_roundtrip() {
        for c in Collection::ALL {
            assert_eq!(c.id().parse::<Collection>().unwrap(), c);
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.id()));
        }
        assert_eq!("S2".parse::<Collection>().unwrap(), Collection::Sentinel2Msi);
        assert!("modis".parse::<Collection>().is_err());
    }

    #[test]
    fn stac_mappings() {
        assert!(Collection::AsterGdem.stac_mapping(&StacCatalog::PlanetaryComputer).is_none());
        assert!(Collection::Srtm.stac_mapping(&StacCatalog::EarthSearch).is_none());

        let s2 = Collection::Sentinel2Msi.stac_mapping(&StacCatalog::EarthSearch).unwrap();
        assert_eq!(s2.asset_for("B11"), Some("swir16"));
        let s2 = Collection::Sentinel2Msi.stac_mapping(&StacCatalog::PlanetaryComputer).unwrap();
        assert_eq!(s2.asset_for("B11"), Some("B11"));

        for c in Collection::ALL {
            if let Some(m) = c.stac_mapping(&StacCatalog::PlanetaryComputer) {
                for band in c.bands() {
                    assert!(m.asset_for(band).is_some(), "{c} {band}");
                }
            }
        }
    }

    #[test]
    fn landsat_thermal_scale_is_celsius() {
        match Collection::Landsat8C2L2.value_scale("ST_B10") {
            ValueScale::Linear { scale, offset } => {
                let kelvin_zero_dn = (273.15 - 149.0) / 0.003_418_02;
                assert!((kelvin_zero_dn * scale + offset).abs() < 1e-9);
            }
            other => panic!("unexpected scale {other:?}"),
        }
    }
}
