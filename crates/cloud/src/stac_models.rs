//! STAC (SpatioTemporal Asset Catalog) data types.
//!
//! Serde models for the subset of STAC Item Search that the provider needs:
//! search bodies, paginated item collections, and the EO, SAT, SAR and
//! projection extension properties used for scene filtering.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::collection::{OrbitDirection, Polarization, SceneProperties};

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Body for `POST /search` (STAC API Item Search).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StacSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Pagination token (next page).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl StacSearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bounding box `[west, south, east, north]`.
    pub fn bbox(mut self, west: f64, south: f64, east: f64, north: f64) -> Self {
        self.bbox = Some(vec![west, south, east, north]);
        self
    }

    /// Set datetime or interval (e.g. `"2021-06-01T00:00:00Z/2021-08-31T23:59:59Z"`).
    pub fn datetime(mut self, dt: &str) -> Self {
        self.datetime = Some(dt.to_string());
        self
    }

    pub fn collections(mut self, cols: &[&str]) -> Self {
        self.collections = Some(cols.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Maximum items per page.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<StacItem>,

    #[serde(default)]
    pub links: Vec<StacLink>,

    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<u64>,

    #[serde(rename = "numberReturned", skip_serializing_if = "Option::is_none")]
    pub number_returned: Option<u64>,
}

impl StacItemCollection {
    /// The `"next"` pagination link, if any.
    pub fn next_link(&self) -> Option<&StacLink> {
        self.links.iter().find(|l| l.rel == "next")
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    #[serde(rename = "type")]
    pub type_: String,

    pub id: String,

    /// Bounding box `[west, south, east, north]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: StacItemProperties,

    pub assets: HashMap<String, StacAsset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl StacItem {
    pub fn asset(&self, key: &str) -> Option<&StacAsset> {
        self.assets.get(key)
    }

    /// EPSG code from `proj:epsg`, falling back to the asset-level value.
    pub fn epsg(&self, asset_key: Option<&str>) -> Option<u32> {
        let from = |extra: &HashMap<String, serde_json::Value>| {
            extra.get("proj:epsg").and_then(|v| v.as_u64()).map(|v| v as u32)
        };
        from(&self.properties.extra)
            .or_else(|| asset_key.and_then(|k| self.asset(k)).and_then(|a| from(&a.extra)))
    }

    /// Acquisition date (UTC) from `datetime`
    pub fn date(&self) -> Option<NaiveDate> {
        let dt = self.properties.datetime.as_deref()?;
        DateTime::parse_from_rfc3339(dt).ok().map(|d| d.date_naive())
    }

    pub fn orbit_state(&self) -> Option<OrbitDirection> {
        self.properties
            .extra
            .get("sat:orbit_state")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }

    pub fn polarizations(&self) -> Vec<Polarization> {
        self.properties
            .extra
            .get("sar:polarizations")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|p| p.as_str())
                    .filter_map(|p| p.parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn instrument_mode(&self) -> Option<&str> {
        self.properties
            .extra
            .get("sar:instrument_mode")
            .and_then(|v| v.as_str())
    }

    /// Filterable properties; `polarizations` must outlive the result.
    pub fn scene_properties<'a>(&'a self, polarizations: &'a [Polarization]) -> SceneProperties<'a> {
        SceneProperties {
            cloud_cover: self.properties.eo_cloud_cover,
            orbit: self.orbit_state(),
            polarizations,
            instrument_mode: self.instrument_mode(),
        }
    }
}

/// STAC Item properties.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// ISO 8601 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage (EO extension).
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    /// Platform name (e.g. "landsat-8").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Everything not modelled explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single STAC Asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    pub href: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A STAC Link (used for pagination).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacLink {
    /// Relationship: `"self"`, `"root"`, `"next"`, `"prev"`, etc.
    pub rel: String,

    pub href: String,

    /// HTTP method for the link (default GET, but `"next"` often uses POST).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request body for POST-based pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// If true, merge `body` into the previous request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::SceneFilter;

    const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "S1A_IW_GRDH_1SDV_20210614T004219_20210614T004244_038307_048547_rtc",
      "bbox": [77.9, 30.2, 80.7, 32.1],
      "properties": {
        "datetime": "2021-06-14T00:42:31.5Z",
        "platform": "SENTINEL-1A",
        "sat:orbit_state": "descending",
        "sar:polarizations": ["VV", "VH"],
        "sar:instrument_mode": "IW",
        "proj:epsg": 32644
      },
      "assets": {
        "vv": {
          "href": "https://example.com/rtc/vv.tif",
          "type": "image/tiff; application=geotiff; profile=cloud-optimized",
          "roles": ["data"]
        },
        "vh": {
          "href": "https://example.com/rtc/vh.tif",
          "type": "image/tiff; application=geotiff; profile=cloud-optimized",
          "roles": ["data"]
        }
      },
      "collection": "sentinel-1-rtc"
    },
    {
      "type": "Feature",
      "id": "LC08_L2SP_146039_20230712_02_T1",
      "properties": {
        "datetime": "2023-07-12T05:04:10Z",
        "platform": "landsat-8",
        "eo:cloud_cover": 12.5
      },
      "assets": {
        "red": {
          "href": "https://example.com/SR_B4.TIF",
          "proj:epsg": 32644
        }
      },
      "collection": "landsat-c2-l2"
    }
  ],
  "links": [
    {
      "rel": "next",
      "href": "https://planetarycomputer.microsoft.com/api/stac/v1/search",
      "method": "POST",
      "body": {"token": "next:abc123"},
      "merge": true
    },
    {
      "rel": "self",
      "href": "https://planetarycomputer.microsoft.com/api/stac/v1/search"
    }
  ],
  "numberMatched": 17,
  "numberReturned": 2
}"#;

    fn collection() -> StacItemCollection {
        serde_json::from_str(FIXTURE).unwrap()
    }

    #[test]
    fn parse_item_collection() {
        let col = collection();
        assert_eq!(col.type_, "FeatureCollection");
        assert_eq!(col.len(), 2);
        assert_eq!(col.number_matched, Some(17));

        let next = col.next_link().unwrap();
        assert_eq!(next.method.as_deref(), Some("POST"));
        assert_eq!(next.merge, Some(true));
    }

    #[test]
    fn sar_extension_properties() {
        let item = &collection().features[0];
        assert_eq!(item.orbit_state(), Some(OrbitDirection::Descending));
        assert_eq!(item.polarizations(), vec![Polarization::VV, Polarization::VH]);
        assert_eq!(item.instrument_mode(), Some("IW"));
        assert_eq!(item.date(), NaiveDate::from_ymd_opt(2021, 6, 14));
        assert_eq!(item.epsg(None), Some(32644));
        assert_eq!(item.asset("vh").unwrap().href, "https://example.com/rtc/vh.tif");
    }

    #[test]
    fn epsg_falls_back_to_asset() {
        let item = &collection().features[1];
        assert_eq!(item.epsg(None), None);
        assert_eq!(item.epsg(Some("red")), Some(32644));
    }

    #[test]
    fn items_feed_scene_filters() {
        let col = collection();
        let optical = SceneFilter {
            max_cloud: Some(20.0),
            ..Default::default()
        };
        let s1 = &col.features[0];
        let l8 = &col.features[1];
        let (p1, p8) = (s1.polarizations(), l8.polarizations());
        assert!(!optical.accepts(&s1.scene_properties(&p1)));
        assert!(optical.accepts(&l8.scene_properties(&p8)));

        let sar = SceneFilter {
            orbit: Some(OrbitDirection::Descending),
            polarizations: vec![Polarization::VV, Polarization::VH],
            instrument_mode: Some("IW".into()),
            ..Default::default()
        };
        assert!(sar.accepts(&s1.scene_properties(&p1)));
        assert!(!sar.accepts(&l8.scene_properties(&p8)));
    }

    #[test]
    fn builder_serializes_only_set_fields() {
        let params = StacSearchParams::new()
            .bbox(78.9, 30.8, 79.2, 31.1)
            .datetime("2021-06-01T00:00:00Z/2021-08-31T23:59:59Z")
            .collections(&["sentinel-1-rtc"])
            .limit(50);

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["bbox"], serde_json::json!([78.9, 30.8, 79.2, 31.1]));
        assert_eq!(json["collections"], serde_json::json!(["sentinel-1-rtc"]));
        assert_eq!(json["limit"], 50);
        assert!(json.get("token").is_none());

        let empty = serde_json::to_value(StacSearchParams::new()).unwrap();
        assert!(empty.as_object().unwrap().is_empty());
    }
}
