//! Fetch orchestration for one category across prioritized sources.
//!
//! Sources are fanned out with bounded concurrency; their log entries are
//! emitted in priority order because the stream is `buffered`, not
//! `buffer_unordered`. A source failure is recorded and never aborts the run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use newsdesk_core::{AppConfig, FetchLogEntry, FetchStatus, RunSummary, SourceBreakdown};
use tokio::time::Instant;
use uuid::Uuid;

use crate::cancel::CancelSignal;
use crate::dedup::{Deduplicator, Verdict};
use crate::error::SourceError;
use crate::normalize::normalize;
use crate::scorer::QualityScorer;
use crate::sources::{AdapterOutcome, SourceDescriptor};
use crate::store::{ArticleStore, RunLogger, UpsertOutcome};

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    /// Upper bound on a single adapter call.
    pub fetch_timeout: Duration,
    /// Wall-clock budget of one category run. Sources not started in time
    /// are logged as `no_data`.
    pub run_budget: Duration,
    /// How many adapter calls may be in flight at once.
    pub max_concurrent: usize,
    /// Floor for the per-source limit so small targets still sample each source.
    pub min_sub_limit: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(8),
            run_budget: Duration::from_secs(30),
            max_concurrent: 4,
            min_sub_limit: 10,
        }
    }
}

impl OrchestratorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            run_budget: Duration::from_secs(config.run_budget_secs),
            max_concurrent: config.max_concurrent_sources.max(1),
            ..Self::default()
        }
    }

    /// `ceil(target / sources)`, raised to the floor and capped at the target.
    #[must_use]
    pub fn sub_limit(&self, target: usize, sources: usize) -> usize {
        if sources == 0 || target == 0 {
            return 0;
        }
        target
            .div_ceil(sources)
            .max(self.min_sub_limit)
            .min(target)
    }
}

pub struct Orchestrator {
    sources: Vec<SourceDescriptor>,
    store: Arc<dyn ArticleStore>,
    logger: Arc<dyn RunLogger>,
    scorer: Arc<dyn QualityScorer>,
    settings: OrchestratorSettings,
}

/// State shared by the source futures of one run.
struct RunContext<'a> {
    run_id: Uuid,
    category: &'a str,
    target: usize,
    sub_limit: usize,
    deadline: Instant,
    cancel: &'a CancelSignal,
    dedup: &'a Deduplicator,
    /// Inserted plus refreshed articles so far.
    progress: &'a AtomicUsize,
}

impl Orchestrator {
    /// Sources are tried in ascending `priority`; ties keep their given order.
    #[must_use]
    pub fn new(
        mut sources: Vec<SourceDescriptor>,
        store: Arc<dyn ArticleStore>,
        logger: Arc<dyn RunLogger>,
        scorer: Arc<dyn QualityScorer>,
        settings: OrchestratorSettings,
    ) -> Self {
        sources.sort_by_key(|s| s.priority);
        Self {
            sources,
            store,
            logger,
            scorer,
            settings,
        }
    }

    /// Ingest `category` until `target` articles are stored or the sources run out.
    ///
    /// With `refresh` set, rows already in the store are re-upserted instead of
    /// being skipped as duplicates. Never fails: every source outcome is in
    /// the returned summary and has been appended to the run logger.
    pub async fn run(
        &self,
        category: &str,
        target: usize,
        refresh: bool,
        cancel: &CancelSignal,
    ) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        let active: Vec<(&SourceDescriptor, String)> = self
            .sources
            .iter()
            .filter_map(|s| s.map_category(category).map(|mapped| (s, mapped)))
            .collect();

        let dedup = Deduplicator::new(Arc::clone(&self.store), !refresh);
        let progress = AtomicUsize::new(0);
        let ctx = RunContext {
            run_id,
            category,
            target,
            sub_limit: self.settings.sub_limit(target, active.len()),
            deadline: started + self.settings.run_budget,
            cancel,
            dedup: &dedup,
            progress: &progress,
        };

        tracing::info!(
            %run_id,
            category,
            target,
            sources = active.len(),
            sub_limit = ctx.sub_limit,
            refresh,
            "starting category run"
        );

        let mut per_source = Vec::with_capacity(active.len());
        let mut logs = Vec::with_capacity(active.len());
        // Source futures are lazy; `buffered` starts at most K of them and
        // yields results in the order they were queued.
        let pending: Vec<_> = active
            .iter()
            .map(|(source, mapped)| self.run_source(&ctx, source, mapped))
            .collect();
        let mut results = stream::iter(pending).buffered(self.settings.max_concurrent.max(1));

        while let Some((entry, breakdown)) = results.next().await {
            if let Err(e) = self.logger.append_entry(run_id, &entry).await {
                tracing::warn!(source = %entry.source_name, error = %e, "failed to append fetch log");
            }
            logs.push(entry);
            per_source.push(breakdown);
        }
        drop(results);

        let duration_ms = elapsed_ms(started);
        let summary =
            RunSummary::from_parts(run_id, category, started_at, duration_ms, per_source, logs);
        if let Err(e) = self.logger.append_summary(&summary).await {
            tracing::warn!(%run_id, error = %e, "failed to append run summary");
        }

        tracing::info!(
            %run_id,
            category,
            fetched = summary.total_fetched,
            stored = summary.total_stored,
            refreshed = summary.total_refreshed,
            duration_ms,
            "category run finished"
        );
        summary
    }

    async fn run_source(
        &self,
        ctx: &RunContext<'_>,
        source: &SourceDescriptor,
        mapped: &str,
    ) -> (FetchLogEntry, SourceBreakdown) {
        let mut breakdown = SourceBreakdown {
            source_name: source.name.clone(),
            ..SourceBreakdown::default()
        };

        let skip_reason = if ctx.cancel.is_cancelled() {
            Some("cancelled")
        } else if Instant::now() >= ctx.deadline {
            Some("run budget exhausted")
        } else if ctx.progress.load(Ordering::SeqCst) >= ctx.target {
            Some("skipped: target reached")
        } else {
            None
        };
        if let Some(reason) = skip_reason {
            tracing::info!(source = %source.name, category = ctx.category, reason, "source skipped");
            let entry = log_entry(
                ctx.category,
                &breakdown,
                FetchStatus::NoData,
                Some(reason.to_string()),
                0,
            );
            return (entry, breakdown);
        }

        let started = Instant::now();
        let outcome = self.fetch(ctx, source, mapped).await;
        breakdown.fetched = count(outcome.items.len());

        let mut error = outcome.error;
        for raw in outcome.items {
            if ctx.cancel.is_cancelled() {
                error.get_or_insert(SourceError::Cancelled);
                break;
            }
            self.process_item(ctx, source, raw, &mut breakdown).await;
        }

        let (status, message) = classify(breakdown.fetched, error.as_ref());
        let execution_time_ms = elapsed_ms(started);
        match status {
            FetchStatus::Error => tracing::warn!(
                source = %source.name,
                category = ctx.category,
                error = message.as_deref().unwrap_or_default(),
                execution_time_ms,
                "source failed"
            ),
            _ => tracing::info!(
                source = %source.name,
                category = ctx.category,
                %status,
                fetched = breakdown.fetched,
                stored = breakdown.stored,
                refreshed = breakdown.refreshed,
                rejected = breakdown.rejected,
                duplicates = breakdown.duplicates,
                execution_time_ms,
                "source finished"
            ),
        }

        let entry = log_entry(ctx.category, &breakdown, status, message, execution_time_ms);
        (entry, breakdown)
    }

    async fn fetch(
        &self,
        ctx: &RunContext<'_>,
        source: &SourceDescriptor,
        mapped: &str,
    ) -> AdapterOutcome {
        let remaining = ctx.deadline.saturating_duration_since(Instant::now());
        let budget = self.settings.fetch_timeout.min(remaining);

        tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => AdapterOutcome::failed(SourceError::Cancelled),
            res = tokio::time::timeout(budget, source.adapter.fetch(mapped, ctx.sub_limit)) => {
                res.unwrap_or_else(|_| {
                    AdapterOutcome::failed(SourceError::Timeout {
                        after_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                    })
                })
            }
        }
    }

    async fn process_item(
        &self,
        ctx: &RunContext<'_>,
        source: &SourceDescriptor,
        raw: crate::types::RawItem,
        breakdown: &mut SourceBreakdown,
    ) {
        let mut draft = match normalize(raw, ctx.category, &source.name, Utc::now()) {
            Ok(draft) => draft,
            Err(reason) => {
                tracing::debug!(source = %source.name, %reason, "item rejected");
                breakdown.rejected += 1;
                return;
            }
        };

        match ctx.dedup.check(&draft).await {
            Ok(Verdict::Fresh) => {}
            Ok(Verdict::SeenInRun | Verdict::AlreadyStored) => {
                breakdown.duplicates += 1;
                return;
            }
            Err(e) => {
                tracing::warn!(source = %source.name, url = %draft.url, error = %e, "duplicate lookup failed");
                breakdown.failed += 1;
                return;
            }
        }

        draft.scores = self.scorer.score(&draft).clamped();

        match self.store.upsert(&draft).await {
            Ok(UpsertOutcome::Inserted(_)) => {
                breakdown.stored += 1;
                ctx.progress.fetch_add(1, Ordering::SeqCst);
            }
            Ok(UpsertOutcome::Updated(_)) => {
                breakdown.refreshed += 1;
                ctx.progress.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                tracing::warn!(
                    run_id = %ctx.run_id,
                    source = %source.name,
                    url = %draft.url,
                    error = %e,
                    "article upsert failed"
                );
                breakdown.failed += 1;
            }
        }
    }
}

/// Maps an adapter outcome onto a log status and message.
///
/// A missing credential is `no_data`, as is a cancellation before anything
/// arrived. Errors that still yielded items are partial successes.
fn classify(fetched: u32, error: Option<&SourceError>) -> (FetchStatus, Option<String>) {
    match error {
        Some(e) if matches!(e, SourceError::MissingCredential { .. }) => {
            (FetchStatus::NoData, Some(e.to_string()))
        }
        Some(SourceError::Cancelled) if fetched == 0 => {
            (FetchStatus::NoData, Some("cancelled".to_string()))
        }
        Some(e) if fetched == 0 => (FetchStatus::Error, Some(e.to_string())),
        Some(e) => (FetchStatus::Success, Some(format!("partial: {e}"))),
        None if fetched == 0 => (FetchStatus::NoData, None),
        None => (FetchStatus::Success, None),
    }
}

fn log_entry(
    category: &str,
    breakdown: &SourceBreakdown,
    status: FetchStatus,
    error_message: Option<String>,
    execution_time_ms: u64,
) -> FetchLogEntry {
    FetchLogEntry {
        source_name: breakdown.source_name.clone(),
        category: category.to_string(),
        articles_fetched: breakdown.fetched,
        articles_stored: breakdown.stored + breakdown.refreshed,
        status,
        error_message,
        execution_time_ms,
        timestamp: Utc::now(),
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
