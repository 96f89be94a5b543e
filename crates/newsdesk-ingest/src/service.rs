//! The inbound surface shared by the CLI and the HTTP server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use newsdesk_core::{AppConfig, FetchLogEntry, FetchStatus, PurgeReport, SourcesFile};
use sqlx::PgPool;

use crate::cancel::{CancelHandle, CancelSignal};
use crate::coordinator::{Coordinator, Pipeline};
use crate::error::IngestError;
use crate::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::scorer::HeuristicScorer;
use crate::sources::{build_descriptors, SourceDescriptor};
use crate::store::{ArticleStore, PgStore, RunLogger};
use crate::types::IngestResponse;

pub const DEFAULT_INGEST_LIMIT: usize = 20;
pub const MAX_INGEST_LIMIT: usize = 100;
pub const MAX_LOG_LIMIT: usize = 200;

pub struct IngestService {
    ingest: Arc<Orchestrator>,
    coordinator: Arc<Coordinator>,
    store: Arc<dyn ArticleStore>,
    logger: Arc<dyn RunLogger>,
    /// The in-flight purge-and-refresh, if any, and the handle that cancels it.
    active: ActiveSlot,
    next_run: AtomicU64,
}

impl IngestService {
    #[must_use]
    pub fn new(
        ingest: Arc<Orchestrator>,
        coordinator: Arc<Coordinator>,
        store: Arc<dyn ArticleStore>,
        logger: Arc<dyn RunLogger>,
    ) -> Self {
        Self {
            ingest,
            coordinator,
            store,
            logger,
            active: Mutex::new(None),
            next_run: AtomicU64::new(0),
        }
    }

    /// Wire the Postgres store, the heuristic scorer and every enabled source.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::HttpClient`] if the outbound client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        sources: &SourcesFile,
        pool: PgPool,
    ) -> Result<Self, IngestError> {
        let descriptors = build_descriptors(sources, config)?;
        let store = Arc::new(PgStore::new(pool));
        let scorer = Arc::new(HeuristicScorer::new(sources.credibility.clone()));
        let settings = OrchestratorSettings::from_app_config(config);

        let orchestrator = |selected: Vec<SourceDescriptor>| {
            Arc::new(Orchestrator::new(
                selected,
                store.clone(),
                store.clone(),
                scorer.clone(),
                settings,
            ))
        };

        let mut every: Vec<SourceDescriptor> = descriptors.values().cloned().collect();
        every.sort_by(|a, b| a.name.cmp(&b.name));
        let ingest = orchestrator(every);
        let pipelines = sources
            .pipelines
            .iter()
            .map(|entry| {
                let selected = select(&descriptors, &entry.sources);
                Pipeline::new(&entry.name, orchestrator(selected))
            })
            .collect();
        let coordinator = Arc::new(Coordinator::new(
            store.clone(),
            pipelines,
            config.refresh_categories.clone(),
            config.refresh_target_per_category,
        ));

        tracing::info!(
            sources = descriptors.len(),
            pipelines = sources.pipelines.len(),
            "ingest service ready"
        );
        Ok(Self::new(ingest, coordinator, store.clone(), store))
    }

    /// One category run across every enabled source.
    ///
    /// `limit` is clamped to `1..=100`. The call succeeds when at least one
    /// source did not error, or when no source serves the category.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidRequest`] for an empty category.
    pub async fn ingest(
        &self,
        category: &str,
        limit: usize,
        force_refresh: bool,
    ) -> Result<IngestResponse, IngestError> {
        let category = category.trim().to_lowercase();
        if category.is_empty() {
            return Err(IngestError::InvalidRequest("category must not be empty".to_string()));
        }
        let limit = limit.clamp(1, MAX_INGEST_LIMIT);

        let summary = self
            .ingest
            .run(&category, limit, force_refresh, &CancelSignal::never())
            .await;
        let success =
            summary.logs.is_empty() || summary.logs.iter().any(|l| l.status != FetchStatus::Error);

        Ok(IngestResponse {
            success,
            total_fetched: summary.total_fetched,
            total_stored: summary.total_stored,
            total_refreshed: summary.total_refreshed,
            logs: summary.logs,
        })
    }

    /// Purge and refill the store. A run already in flight is cancelled first.
    ///
    /// Dropping the returned future cancels the run's pipelines and frees the
    /// slot for the next caller.
    pub async fn purge_and_refresh(&self, max_age_hours: u32, wipe_all: bool) -> PurgeReport {
        let run = self.next_run.fetch_add(1, Ordering::SeqCst);
        let handle = CancelHandle::new();
        let signal = handle.signal();
        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((previous, old)) = active.replace((run, handle)) {
                tracing::info!(superseded = previous, run, "cancelling in-flight refresh");
                old.cancel();
            }
        }

        let _guard = ActiveRun {
            slot: &self.active,
            run,
        };
        self.coordinator.run(max_age_hours, wipe_all, &signal).await
    }

    /// Most recent fetch log entries, newest first. `limit` is clamped to `1..=200`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Store`] if the log cannot be read.
    pub async fn recent_logs(&self, limit: usize) -> Result<Vec<FetchLogEntry>, IngestError> {
        Ok(self.logger.recent(limit.clamp(1, MAX_LOG_LIMIT)).await?)
    }

    /// # Errors
    ///
    /// Returns [`IngestError::Store`] if the store does not answer.
    pub async fn health(&self) -> Result<(), IngestError> {
        Ok(self.store.ping().await?)
    }

    #[must_use]
    pub fn refresh_in_flight(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

type ActiveSlot = Mutex<Option<(u64, CancelHandle)>>;

/// Clears this run's supersession slot however the run ends.
struct ActiveRun<'a> {
    slot: &'a ActiveSlot,
    run: u64,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        let mut active = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|(id, _)| *id == self.run) {
            if let Some((_, handle)) = active.take() {
                // No-op for a finished run; stops orphaned pipelines otherwise.
                handle.cancel();
            }
        }
    }
}

fn select(descriptors: &HashMap<String, SourceDescriptor>, names: &[String]) -> Vec<SourceDescriptor> {
    names
        .iter()
        .filter_map(|name| {
            let found = descriptors.get(name).cloned();
            if found.is_none() {
                tracing::warn!(source = %name, "pipeline source is disabled or unknown, skipping");
            }
            found
        })
        .collect()
}
