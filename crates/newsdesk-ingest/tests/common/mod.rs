//! Scripted adapters and wiring shared by the orchestration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use newsdesk_ingest::{
    AdapterOutcome, Coordinator, HeuristicScorer, IngestService, MemoryStore, Orchestrator,
    OrchestratorSettings, Pipeline, RawItem, SourceAdapter, SourceDescriptor, SourceError,
};

#[derive(Debug, Clone, Copy)]
pub enum StubFailure {
    Upstream,
    MissingKey,
    Panic,
}

/// Returns a fixed batch, optionally after a delay and with an error attached.
pub struct StubAdapter {
    items: Vec<RawItem>,
    failure: Option<StubFailure>,
    delay: Duration,
    calls: AtomicUsize,
    last_limit: AtomicUsize,
}

impl StubAdapter {
    pub fn returning(items: Vec<RawItem>) -> Self {
        Self {
            items,
            failure: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_limit: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::returning(Vec::new()).with_failure(StubFailure::Upstream)
    }

    pub fn with_failure(mut self, failure: StubFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> usize {
        self.last_limit.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    async fn fetch(&self, _category: &str, limit: usize) -> AdapterOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let error = match self.failure {
            None => None,
            Some(StubFailure::Upstream) => Some(SourceError::UnexpectedStatus {
                status: 503,
                url: "https://stub.invalid/feed".to_string(),
            }),
            Some(StubFailure::MissingKey) => Some(SourceError::MissingCredential {
                source_name: "stub".to_string(),
                var: "NEWS_API_KEY",
            }),
            Some(StubFailure::Panic) => panic!("stub adapter exploded"),
        };
        AdapterOutcome::partial(self.items.clone(), error)
    }
}

pub fn raw(title: &str, url: &str) -> RawItem {
    RawItem {
        title: Some(title.to_string()),
        url: Some(url.to_string()),
        description: Some(format!("Summary of {title}")),
        ..RawItem::default()
    }
}

/// `n` distinct items whose urls are namespaced by `prefix`.
pub fn batch(prefix: &str, n: usize) -> Vec<RawItem> {
    (0..n)
        .map(|i| raw(&format!("{prefix} story {i}"), &format!("https://{prefix}.example.com/{i}")))
        .collect()
}

pub fn source(name: &str, priority: u32, adapter: &Arc<StubAdapter>) -> SourceDescriptor {
    SourceDescriptor::new(name, priority, adapter.clone())
}

pub fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        fetch_timeout: Duration::from_secs(2),
        run_budget: Duration::from_secs(30),
        max_concurrent: 4,
        min_sub_limit: 10,
    }
}

pub fn orchestrator(
    sources: Vec<SourceDescriptor>,
    store: &Arc<MemoryStore>,
    settings: OrchestratorSettings,
) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(
        sources,
        store.clone(),
        store.clone(),
        Arc::new(HeuristicScorer::default()),
        settings,
    ))
}

pub fn coordinator(
    pipelines: Vec<(&str, Vec<SourceDescriptor>)>,
    store: &Arc<MemoryStore>,
    settings: OrchestratorSettings,
) -> Coordinator {
    let pipelines = pipelines
        .into_iter()
        .map(|(name, sources)| Pipeline::new(name, orchestrator(sources, store, settings)))
        .collect();
    Coordinator::new(store.clone(), pipelines, vec!["general".to_string()], 30)
}

/// A service whose ingest path and single refresh pipeline share `sources`.
pub fn service(
    sources: Vec<SourceDescriptor>,
    store: &Arc<MemoryStore>,
    settings: OrchestratorSettings,
) -> IngestService {
    let ingest = orchestrator(sources.clone(), store, settings);
    let coordinator = Arc::new(coordinator(vec![("primary", sources)], store, settings));
    IngestService::new(ingest, coordinator, store.clone(), store.clone())
}
