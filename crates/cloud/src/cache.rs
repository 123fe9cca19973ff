//! On-disk cache of downloaded assets.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::stac_client::StacClient;

/// Directory of downloaded assets, keyed by URL without its query string so
/// that re-signed hrefs hit the same file.
#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local path for `url`: host and path segments joined with `_`.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let without_query = url.split(['?', '#']).next().unwrap_or(url);
        let without_scheme = without_query
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(without_query);
        let name: String = without_scheme
            .trim_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(name)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.path_for(url)
            .metadata()
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// Path of the cached copy of `href`, signing and downloading it on a
    /// miss.
    pub async fn fetch(&self, client: &StacClient, href: &str) -> Result<PathBuf> {
        let path = self.path_for(href);
        if self.contains(href) {
            debug!("cache hit {}", path.display());
            return Ok(path);
        }
        std::fs::create_dir_all(&self.dir)?;
        let signed = client.sign_asset_href(href).await?;
        let bytes = client.fetch_bytes(&signed).await?;
        // An interrupted download must never look cached
        let partial = path.with_extension("part");
        std::fs::write(&partial, &bytes)?;
        std::fs::rename(&partial, &path)?;
        debug!("cached {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}
