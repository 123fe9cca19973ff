//! Async STAC client for searching spatio-temporal asset catalogs.
//!
//! Supports Planetary Computer and Earth Search out of the box, plus
//! arbitrary STAC API endpoints via [`StacCatalog::Custom`].

use std::time::Duration;

use tracing::debug;

use crate::error::{CloudError, Result};
use crate::retry::RetryPolicy;
use crate::stac_models::{StacItem, StacItemCollection, StacLink, StacSearchParams};

const PC_SIGN_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1/sign";

// ---------------------------------------------------------------------------
// Catalog enum
// ---------------------------------------------------------------------------

/// Well-known STAC catalogs plus custom endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StacCatalog {
    /// Microsoft Planetary Computer STAC API.
    PlanetaryComputer,
    /// AWS Earth Search (Element 84).
    EarthSearch,
    /// Any STAC API root URL, e.g. `"https://my-stac.example.com/api/v1"`.
    Custom(String),
}

impl StacCatalog {
    /// Full POST `/search` URL for this catalog.
    pub fn search_url(&self) -> String {
        match self {
            Self::PlanetaryComputer => {
                "https://planetarycomputer.microsoft.com/api/stac/v1/search".to_string()
            }
            Self::EarthSearch => "https://earth-search.aws.element84.com/v1/search".to_string(),
            Self::Custom(base) => {
                let base = base.trim_end_matches('/');
                if base.ends_with("/search") {
                    base.to_string()
                } else {
                    format!("{}/search", base)
                }
            }
        }
    }

    /// Parse a shorthand (`pc`, `planetary-computer`, `es`, `earth-search`)
    /// or treat the string as a custom URL.
    pub fn from_str_or_url(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pc" | "planetary-computer" | "planetarycomputer" => Self::PlanetaryComputer,
            "es" | "earth-search" | "earthsearch" => Self::EarthSearch,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Whether asset hrefs need a SAS token before download.
    pub fn needs_signing(&self) -> bool {
        matches!(self, Self::PlanetaryComputer)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::PlanetaryComputer => "planetary-computer",
            Self::EarthSearch => "earth-search",
            Self::Custom(url) => url,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`StacClient`].
#[derive(Debug, Clone)]
pub struct StacClientOptions {
    /// Per-request timeout (default 30 s).
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Maximum total items to fetch across pages (default 200).
    pub max_items: usize,
}

impl Default for StacClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            max_items: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Async client for STAC Item Search and asset download.
pub struct StacClient {
    catalog: StacCatalog,
    client: reqwest::Client,
    options: StacClientOptions,
}

impl StacClient {
    pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;
        Ok(Self {
            catalog,
            client,
            options,
        })
    }

    pub fn catalog(&self) -> &StacCatalog {
        &self.catalog
    }

    /// Execute a single search request and return one page of results.
    pub async fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        let url = self.catalog.search_url();
        self.post_search(&url, params).await
    }

    /// Search with automatic pagination, collecting up to `max_items` items.
    pub async fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
        let max = self.options.max_items;
        let mut all_items: Vec<StacItem> = Vec::new();
        let mut page = self.search(params).await?;

        loop {
            let next = page.next_link().cloned();
            all_items.append(&mut page.features);
            debug!("STAC search: {} items so far", all_items.len());

            if all_items.len() >= max {
                break;
            }
            match next {
                Some(link) => {
                    page = self.follow_next(&link, params).await?;
                    if page.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }

        all_items.truncate(max);
        Ok(all_items)
    }

    /// Sign an asset href for Planetary Computer; other catalogs return it
    /// unchanged.
    pub async fn sign_asset_href(&self, href: &str) -> Result<String> {
        if !self.catalog.needs_signing() {
            return Ok(href.to_string());
        }
        let body: serde_json::Value = self
            .options
            .retry
            .run("asset signing", || async {
                let resp = self
                    .client
                    .get(PC_SIGN_URL)
                    .query(&[("href", href)])
                    .send()
                    .await?;
                Ok::<_, CloudError>(check_status(resp).await?.json::<serde_json::Value>().await?)
            })
            .await?;

        body["href"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CloudError::Catalog("sign response missing 'href' field".into()))
    }

    /// Download a whole asset.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.options
            .retry
            .run("asset download", || async {
                let resp = self.client.get(url).send().await?;
                Ok::<_, CloudError>(check_status(resp).await?.bytes().await?.to_vec())
            })
            .await
    }

    // ── Private helpers ─────────────────────────────────────────────

    async fn post_search(&self, url: &str, params: &StacSearchParams) -> Result<StacItemCollection> {
        self.options
            .retry
            .run("STAC search", || async {
                let resp = self
                    .client
                    .post(url)
                    .header("Content-Type", "application/json")
                    .json(params)
                    .send()
                    .await?;
                let body = check_status(resp).await?.text().await?;
                Ok::<_, CloudError>(serde_json::from_str::<StacItemCollection>(&body)?)
            })
            .await
    }

    /// Follow a pagination link. Handles both POST (body/merge) and GET links.
    async fn follow_next(
        &self,
        link: &StacLink,
        original_params: &StacSearchParams,
    ) -> Result<StacItemCollection> {
        let method = link.method.as_deref().unwrap_or("GET").to_uppercase();

        if method == "POST" {
            let body = match (&link.body, link.merge.unwrap_or(false)) {
                (Some(link_body), true) => {
                    let mut base = serde_json::to_value(original_params)?;
                    if let (Some(base_obj), Some(link_obj)) =
                        (base.as_object_mut(), link_body.as_object())
                    {
                        for (k, v) in link_obj {
                            base_obj.insert(k.clone(), v.clone());
                        }
                    }
                    base
                }
                (Some(link_body), false) => link_body.clone(),
                (None, _) => serde_json::to_value(original_params)?,
            };
            let merged: StacSearchParams = serde_json::from_value(body)?;
            self.post_search(&link.href, &merged).await
        } else {
            self.options
                .retry
                .run("STAC pagination", || async {
                    let resp = self.client.get(&link.href).send().await?;
                    let body = check_status(resp).await?.text().await?;
                    Ok::<_, CloudError>(serde_json::from_str::<StacItemCollection>(&body)?)
                })
                .await
        }
    }
}

/// Map non-success statuses onto the error taxonomy.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    let body = resp.text().await.unwrap_or_default();
    let detail: String = body.chars().take(300).collect();
    match status.as_u16() {
        401 | 403 => Err(CloudError::Auth {
            status: status.as_u16(),
            detail,
        }),
        code => Err(CloudError::Http {
            status: code,
            url,
            detail,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_search_urls() {
        assert_eq!(
            StacCatalog::PlanetaryComputer.search_url(),
            "https://planetarycomputer.microsoft.com/api/stac/v1/search"
        );
        assert_eq!(
            StacCatalog::EarthSearch.search_url(),
            "https://earth-search.aws.element84.com/v1/search"
        );
        assert_eq!(
            StacCatalog::Custom("https://example.com/stac/".into()).search_url(),
            "https://example.com/stac/search"
        );
        assert_eq!(
            StacCatalog::Custom("https://example.com/stac/search".into()).search_url(),
            "https://example.com/stac/search"
        );
    }

    #[test]
    fn catalog_shorthands_keep_custom_url_case() {
        assert_eq!(StacCatalog::from_str_or_url("PC"), StacCatalog::PlanetaryComputer);
        assert_eq!(StacCatalog::from_str_or_url("earth-search"), StacCatalog::EarthSearch);
        assert_eq!(
            StacCatalog::from_str_or_url("https://Stac.Example.com/v1"),
            StacCatalog::Custom("https://Stac.Example.com/v1".into())
        );
        assert!(StacCatalog::PlanetaryComputer.needs_signing());
        assert!(!StacCatalog::EarthSearch.needs_signing());
    }

    #[test]
    fn client_builds_with_defaults() {
        let client = StacClient::new(StacCatalog::EarthSearch, StacClientOptions::default()).unwrap();
        assert_eq!(client.catalog(), &StacCatalog::EarthSearch);
    }
}
