//! RSS feed adapter.
//!
//! The registry endpoint may contain a `{category}` placeholder, which is
//! replaced with the percent-encoded, source-specific category name.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use super::http::send_checked;
use super::retry::{retry_with_backoff, RetryPolicy};
use super::rss_helpers::parse_feed;
use super::{AdapterOutcome, SourceAdapter};
use crate::error::SourceError;

pub struct RssAdapter {
    name: String,
    endpoint: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl RssAdapter {
    #[must_use]
    pub fn new(name: &str, endpoint: &str, client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            client,
            retry,
        }
    }

    fn feed_url(&self, category: &str) -> String {
        let encoded = utf8_percent_encode(category, NON_ALPHANUMERIC).to_string();
        self.endpoint.replace("{category}", &encoded)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn fetch(&self, category: &str, limit: usize) -> AdapterOutcome {
        let url = self.feed_url(category);
        let body = retry_with_backoff(self.retry, &self.name, || {
            let request = self.client.get(&url);
            async move { Ok::<_, SourceError>(send_checked(request).await?.text().await?) }
        })
        .await;

        let body = match body {
            Ok(body) => body,
            Err(e) => return AdapterOutcome::failed(e),
        };

        let (items, parse_error) = parse_feed(&body, limit);
        match parse_error {
            // A malformed tail only costs the items after it.
            Some(e) if !items.is_empty() => {
                tracing::warn!(
                    source = %self.name,
                    kept = items.len(),
                    error = %e,
                    "RSS feed malformed part-way, keeping parsed items"
                );
                AdapterOutcome::partial(items, Some(SourceError::Xml(e)))
            }
            Some(e) => AdapterOutcome::failed(SourceError::Xml(e)),
            None => AdapterOutcome::ok(items),
        }
    }
}
