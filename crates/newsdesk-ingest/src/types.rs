use chrono::{DateTime, Utc};
use newsdesk_core::FetchLogEntry;
use serde::Serialize;

/// A source-specific item as returned by an adapter, before normalization.
///
/// Every field is optional: adapters map whatever the provider returned and
/// leave rejection of incomplete items to the normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    /// Explicit image field (`urlToImage`, RSS enclosure, `og:image`).
    pub image: Option<String>,
    /// Thumbnail field (`media:thumbnail`).
    pub thumbnail: Option<String>,
    /// Image discovered in the page or description markup.
    pub page_image: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Publisher label reported by the provider, if any.
    pub source_label: Option<String>,
}

/// Result of an `Ingest` call.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub total_fetched: u64,
    pub total_stored: u64,
    pub total_refreshed: u64,
    pub logs: Vec<FetchLogEntry>,
}
