//! Title and release-year lookup
//!
//! Metadata enrichment is best effort: resolvers never fail, they fall back to
//! [`GameMetadata::unknown`] so a catalog outage cannot block archiving.

use crate::types::{GameMetadata, UNKNOWN_TITLE, UNKNOWN_YEAR};
use async_trait::async_trait;

mod catalog;

pub use catalog::{CatalogClient, CatalogProduct};

/// Resolves a catalog identifier to title and release year
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Look up `catalog_id`; falls back to sentinel metadata on any failure
    async fn resolve(&self, catalog_id: &str) -> GameMetadata;

    /// Name of this resolver for logging
    fn name(&self) -> &'static str;
}

/// Resolver that always returns sentinel metadata
///
/// Used when no catalog is reachable or configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpResolver;

#[async_trait]
impl MetadataResolver for NoOpResolver {
    async fn resolve(&self, _catalog_id: &str) -> GameMetadata {
        GameMetadata::unknown()
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Year portion of an ISO-like date (`"2019-03-01"`, `"2019-03-01T00:00:00+0200"`)
///
/// Takes the text before the first `-`; anything that is not four ASCII digits
/// yields [`UNKNOWN_YEAR`].
pub fn parse_release_year(release_date: Option<&str>) -> String {
    let Some(date) = release_date.map(str::trim).filter(|d| !d.is_empty()) else {
        return UNKNOWN_YEAR.to_string();
    };

    let year = date.split('-').next().unwrap_or_default();
    if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) {
        year.to_string()
    } else {
        UNKNOWN_YEAR.to_string()
    }
}

/// Title with the sentinel substituted for missing or blank values
pub fn normalize_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNKNOWN_TITLE.to_string(),
    }
}
