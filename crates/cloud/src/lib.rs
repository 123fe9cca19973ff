//! # glacis cloud
//!
//! Imagery acquisition for the glacis studies.
//!
//! A study asks an [`ImageryProvider`] for a [`Composite`]: the per-pixel
//! median of every scene of a [`Collection`] that overlaps the region,
//! falls in the date range and passes the [`SceneFilter`]. Two providers
//! ship with the crate:
//!
//! - [`LocalArchive`]: a directory of WGS84 GeoTIFFs indexed by `catalog.json`
//! - [`StacProvider`]: STAC Item Search on Planetary Computer, Earth Search
//!   or a custom endpoint, with a blocking API over an internal tokio runtime

pub mod archive;
pub mod cache;
pub mod collection;
pub mod composite;
pub mod error;
pub mod provider;
pub mod reproject;
pub mod retry;
pub mod stac;
pub mod stac_client;
pub mod stac_models;

pub use archive::{ArchiveCatalog, ArchiveScene, LocalArchive};
pub use collection::{
    Collection, DateRange, ImageryRequest, OrbitDirection, Polarization, SceneFilter, ValueScale,
};
pub use composite::{Composite, MedianCompositor};
pub use error::{CloudError, Result};
pub use provider::ImageryProvider;
pub use retry::RetryPolicy;
pub use stac::{StacProvider, StacProviderOptions};
pub use stac_client::{StacCatalog, StacClient, StacClientOptions};
pub use stac_models::{StacItem, StacItemCollection, StacSearchParams};
