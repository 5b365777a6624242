//! HTTP client for the remote game catalog (GOG products API)

use super::{MetadataResolver, normalize_title, parse_release_year};
use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use crate::types::GameMetadata;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

/// Fields of a catalog product the pipeline cares about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogProduct {
    /// Product title
    #[serde(default)]
    pub title: Option<String>,
    /// ISO-like release date
    #[serde(default)]
    pub release_date: Option<String>,
}

impl CatalogProduct {
    /// Convert into metadata, substituting sentinels for missing fields
    pub fn into_metadata(self) -> GameMetadata {
        GameMetadata {
            title: normalize_title(self.title.as_deref()),
            release_year: parse_release_year(self.release_date.as_deref()),
        }
    }
}

/// Catalog lookup over HTTP: `GET {base_url}/products/{id}`
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Build a client from catalog settings
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint for a single product
    pub fn product_url(&self, catalog_id: &str) -> String {
        format!(
            "{}/products/{}",
            self.base_url,
            urlencoding::encode(catalog_id)
        )
    }

    /// Fetch a product, surfacing every failure
    ///
    /// [`MetadataResolver::resolve`] wraps this and degrades errors to sentinels.
    pub async fn fetch_product(&self, catalog_id: &str) -> Result<CatalogProduct> {
        let url = self.product_url(catalog_id);
        debug!(%url, "fetching catalog metadata");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::NotFound(format!(
                "catalog returned {} for product {}",
                status, catalog_id
            )));
        }

        Ok(response.json::<CatalogProduct>().await?)
    }
}

#[async_trait]
impl MetadataResolver for CatalogClient {
    async fn resolve(&self, catalog_id: &str) -> GameMetadata {
        match self.fetch_product(catalog_id).await {
            Ok(product) => {
                let metadata = product.into_metadata();
                debug!(
                    catalog_id,
                    title = %metadata.title,
                    year = %metadata.release_year,
                    "resolved catalog metadata"
                );
                metadata
            }
            Err(e) => {
                warn!(
                    catalog_id,
                    error = %e,
                    "catalog lookup failed, using placeholder metadata"
                );
                GameMetadata::unknown()
            }
        }
    }

    fn name(&self) -> &'static str {
        "catalog-http"
    }
}
