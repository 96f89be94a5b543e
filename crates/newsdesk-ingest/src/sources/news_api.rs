//! REST top-headlines adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http::send_checked;
use super::retry::{retry_with_backoff, RetryPolicy};
use super::{AdapterOutcome, SourceAdapter};
use crate::error::SourceError;
use crate::types::RawItem;

/// Provider page size ceiling.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    articles: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiArticle {
    source: Option<ApiSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSource {
    name: Option<String>,
}

pub struct NewsApiAdapter {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl NewsApiAdapter {
    #[must_use]
    pub fn new(
        name: &str,
        endpoint: &str,
        api_key: Option<String>,
        client: reqwest::Client,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            api_key,
            client,
            retry,
        }
    }

    async fn fetch_page(&self, api_key: &str, category: &str, limit: usize) -> Result<String, SourceError> {
        let page_size = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        retry_with_backoff(self.retry, &self.name, || {
            let request = self
                .client
                .get(&self.endpoint)
                .header("X-Api-Key", api_key)
                .query(&[
                    ("category", category),
                    ("pageSize", page_size.as_str()),
                    ("language", "en"),
                ]);
            async move { Ok::<_, SourceError>(send_checked(request).await?.text().await?) }
        })
        .await
    }
}

#[async_trait]
impl SourceAdapter for NewsApiAdapter {
    async fn fetch(&self, category: &str, limit: usize) -> AdapterOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return AdapterOutcome::failed(SourceError::MissingCredential {
                source_name: self.name.clone(),
                var: "NEWS_API_KEY",
            });
        };

        let body = match self.fetch_page(api_key, category, limit).await {
            Ok(body) => body,
            Err(e) => return AdapterOutcome::failed(e),
        };

        match parse_headlines(&body, limit) {
            Ok(items) => AdapterOutcome::ok(items),
            Err(source) => AdapterOutcome::failed(SourceError::Deserialize {
                context: format!("{} headlines", self.name),
                source,
            }),
        }
    }
}

/// Parses a headlines payload. Individual articles that do not match the
/// expected shape are skipped; only a malformed envelope is an error.
pub(crate) fn parse_headlines(body: &str, limit: usize) -> Result<Vec<RawItem>, serde_json::Error> {
    let response: HeadlinesResponse = serde_json::from_str(body)?;
    let items = response
        .articles
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ApiArticle>(value).ok())
        .filter(|article| article.title.as_deref() != Some("[Removed]"))
        .map(into_raw_item)
        .take(limit)
        .collect();
    Ok(items)
}

fn into_raw_item(article: ApiArticle) -> RawItem {
    RawItem {
        title: article.title,
        description: article.description,
        content: article.content,
        url: article.url,
        image: article.url_to_image,
        thumbnail: None,
        page_image: None,
        author: article.author,
        published_at: article
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        source_label: article.source.and_then(|s| s.name),
    }
}
