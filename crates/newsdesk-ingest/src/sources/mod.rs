//! Source adapters and the descriptors the orchestrator iterates over.

mod http;
mod news_api;
mod retry;
mod rss;
mod rss_helpers;
mod scrape;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use newsdesk_core::{AppConfig, SourceEntry, SourceKind, SourcesFile};

use crate::error::SourceError;
use crate::types::RawItem;

pub use http::{build_client, HttpSettings};
pub use news_api::NewsApiAdapter;
pub use retry::RetryPolicy;
pub use rss::RssAdapter;
pub use scrape::ScrapeAdapter;

/// What one adapter call produced: the parseable items plus the reason the
/// call failed or was cut short, if it was.
#[derive(Debug, Default)]
pub struct AdapterOutcome {
    pub items: Vec<RawItem>,
    pub error: Option<SourceError>,
}

impl AdapterOutcome {
    #[must_use]
    pub fn ok(items: Vec<RawItem>) -> Self {
        Self { items, error: None }
    }

    #[must_use]
    pub fn failed(error: SourceError) -> Self {
        Self {
            items: Vec::new(),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn partial(items: Vec<RawItem>, error: Option<SourceError>) -> Self {
        Self { items, error }
    }
}

/// Fetches raw items from one external source.
///
/// Implementations never fail outright: a missing credential, a network error
/// or an unparseable payload is reported through [`AdapterOutcome::error`]
/// next to whatever items could be salvaged. Dropping the returned future
/// cancels the outbound call.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// `category` is already mapped into the source's own vocabulary.
    async fn fetch(&self, category: &str, limit: usize) -> AdapterOutcome;
}

type CategoryMapper = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A named, prioritized adapter plus its category mapping.
#[derive(Clone)]
pub struct SourceDescriptor {
    pub name: String,
    /// Lower values are tried first. Ordering only; never a gate.
    pub priority: u32,
    map_category: CategoryMapper,
    pub adapter: Arc<dyn SourceAdapter>,
}

impl SourceDescriptor {
    /// Descriptor that serves every category under its own name.
    pub fn new(name: impl Into<String>, priority: u32, adapter: Arc<dyn SourceAdapter>) -> Self {
        Self {
            name: name.into(),
            priority,
            map_category: Arc::new(|category: &str| Some(category.to_string())),
            adapter,
        }
    }

    #[must_use]
    pub fn with_category_map<F>(mut self, map: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.map_category = Arc::new(map);
        self
    }

    /// The source's own name for `category`, or `None` if it does not serve it.
    #[must_use]
    pub fn map_category(&self, category: &str) -> Option<String> {
        (self.map_category)(category)
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Builds a descriptor for every enabled registry entry, keyed by source name.
///
/// # Errors
///
/// Returns [`reqwest::Error`] if the shared HTTP client cannot be built.
pub fn build_descriptors(
    sources: &SourcesFile,
    config: &AppConfig,
) -> Result<HashMap<String, SourceDescriptor>, reqwest::Error> {
    let settings = HttpSettings::from_app_config(config);
    let client = build_client(&settings)?;

    let descriptors = sources
        .sources
        .iter()
        .filter(|entry| entry.enabled)
        .map(|entry| {
            let adapter = build_adapter(entry, config, &client, settings.retry);
            let mapped = entry.clone();
            let descriptor = SourceDescriptor::new(&entry.name, entry.priority, adapter)
                .with_category_map(move |category| mapped.map_category(category));
            (entry.name.clone(), descriptor)
        })
        .collect();

    Ok(descriptors)
}

fn build_adapter(
    entry: &SourceEntry,
    config: &AppConfig,
    client: &reqwest::Client,
    retry: RetryPolicy,
) -> Arc<dyn SourceAdapter> {
    match entry.kind {
        SourceKind::NewsApi => Arc::new(NewsApiAdapter::new(
            &entry.name,
            &entry.endpoint,
            config.news_api_key.clone(),
            client.clone(),
            retry,
        )),
        SourceKind::Rss => Arc::new(RssAdapter::new(
            &entry.name,
            &entry.endpoint,
            client.clone(),
            retry,
        )),
        SourceKind::Scrape => Arc::new(ScrapeAdapter::new(
            &entry.name,
            &entry.endpoint,
            config.scrape_api_key.clone(),
            entry.seed_urls.clone(),
            client.clone(),
            retry,
        )),
    }
}
