//! Scrape-service adapter: posts a page URL, receives the main content as
//! markdown plus page metadata.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use super::http::send_checked;
use super::retry::{retry_with_backoff, RetryPolicy};
use super::{AdapterOutcome, SourceAdapter};
use crate::error::SourceError;
use crate::types::RawItem;

static MD_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(([^)\s]+)[^)]*\)").expect("valid image regex"));
static MD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link regex"));

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
    #[serde(default)]
    metadata: ScrapeMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeMetadata {
    title: Option<String>,
    description: Option<String>,
    og_image: Option<String>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    author: Option<String>,
    #[serde(alias = "article:published_time")]
    published_time: Option<String>,
    site_name: Option<String>,
}

pub struct ScrapeAdapter {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    seed_urls: BTreeMap<String, Vec<String>>,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ScrapeAdapter {
    #[must_use]
    pub fn new(
        name: &str,
        endpoint: &str,
        api_key: Option<String>,
        seed_urls: BTreeMap<String, Vec<String>>,
        client: reqwest::Client,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            api_key,
            seed_urls,
            client,
            retry,
        }
    }

    async fn scrape_page(&self, api_key: &str, page_url: &str) -> Result<Option<RawItem>, SourceError> {
        let body = json!({ "url": page_url, "formats": ["markdown"], "onlyMainContent": true });
        let text = retry_with_backoff(self.retry, &self.name, || {
            let request = self.client.post(&self.endpoint).bearer_auth(api_key).json(&body);
            async move { Ok::<_, SourceError>(send_checked(request).await?.text().await?) }
        })
        .await?;

        let response: ScrapeResponse =
            serde_json::from_str(&text).map_err(|source| SourceError::Deserialize {
                context: format!("{} scrape of {page_url}", self.name),
                source,
            })?;

        if !response.success {
            return Ok(None);
        }
        Ok(response.data.map(|data| into_raw_item(data, page_url)))
    }
}

#[async_trait]
impl SourceAdapter for ScrapeAdapter {
    async fn fetch(&self, category: &str, limit: usize) -> AdapterOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return AdapterOutcome::failed(SourceError::MissingCredential {
                source_name: self.name.clone(),
                var: "SCRAPE_API_KEY",
            });
        };
        let Some(seeds) = self.seed_urls.get(category) else {
            return AdapterOutcome::default();
        };

        let mut items = Vec::new();
        let mut first_error = None;
        for page_url in seeds.iter().take(limit) {
            match self.scrape_page(api_key, page_url).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {
                    tracing::debug!(source = %self.name, url = %page_url, "scrape returned no content");
                }
                Err(e) => {
                    tracing::warn!(source = %self.name, url = %page_url, error = %e, "scrape failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        AdapterOutcome::partial(items, first_error)
    }
}

fn into_raw_item(data: ScrapeData, page_url: &str) -> RawItem {
    let markdown = data.markdown.unwrap_or_default();
    let page_image = MD_IMAGE
        .captures(&markdown)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let meta = data.metadata;

    RawItem {
        title: meta.title,
        description: meta.description,
        content: Some(markdown_to_text(&markdown)).filter(|c| !c.is_empty()),
        url: meta.source_url.or_else(|| Some(page_url.to_string())),
        image: meta.og_image,
        thumbnail: None,
        page_image,
        author: meta.author,
        published_at: meta
            .published_time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        source_label: meta.site_name,
    }
}

/// Drops images and link targets, keeping link text and line structure.
fn markdown_to_text(markdown: &str) -> String {
    let without_images = MD_IMAGE.replace_all(markdown, "");
    let without_links = MD_LINK.replace_all(&without_images, "$1");
    without_links
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
