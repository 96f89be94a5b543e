//! Purge-then-refill maintenance across independently configured pipelines.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use newsdesk_core::{FetchStatus, PipelineBreakdown, PurgeReport, RunSummary};
use tokio::time::Instant;

use crate::cancel::CancelSignal;
use crate::orchestrator::Orchestrator;
use crate::store::ArticleStore;

/// A named orchestrator over its own source set. Pipelines may overlap and
/// act as fallbacks of each other; each run gets its own dedup scope.
#[derive(Clone)]
pub struct Pipeline {
    pub name: String,
    pub orchestrator: Arc<Orchestrator>,
}

impl Pipeline {
    #[must_use]
    pub fn new(name: impl Into<String>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            name: name.into(),
            orchestrator,
        }
    }
}

pub struct Coordinator {
    store: Arc<dyn ArticleStore>,
    pipelines: Vec<Pipeline>,
    categories: Vec<String>,
    target_per_category: usize,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        store: Arc<dyn ArticleStore>,
        pipelines: Vec<Pipeline>,
        categories: Vec<String>,
        target_per_category: usize,
    ) -> Self {
        Self {
            store,
            pipelines,
            categories,
            target_per_category,
        }
    }

    /// Purge, refill every pipeline concurrently, then run store maintenance.
    ///
    /// A purge failure is fatal and skips everything else. Pipeline failures
    /// only zero that pipeline's contribution; `success` stays `true`.
    pub async fn run(&self, max_age_hours: u32, wipe_all: bool, cancel: &CancelSignal) -> PurgeReport {
        let started = Instant::now();
        let mut report = PurgeReport {
            success: false,
            removed: 0,
            articles_added: 0,
            per_pipeline: Vec::new(),
            duplicates_cleaned: 0,
            freshness_updated: 0,
            duration_ms: 0,
            error: None,
        };

        let purged = if wipe_all {
            self.store.delete_all().await
        } else {
            let cutoff = Utc::now() - ChronoDuration::hours(i64::from(max_age_hours));
            self.store.delete_older_than(cutoff).await
        };
        match purged {
            Ok(removed) => {
                tracing::info!(removed, wipe_all, max_age_hours, "purge complete");
                report.removed = removed;
                report.success = true;
            }
            Err(e) => {
                tracing::error!(error = %e, wipe_all, max_age_hours, "purge failed, refresh aborted");
                report.error = Some(format!("purge failed: {e}"));
                report.duration_ms = elapsed_ms(started);
                return report;
            }
        }

        let handles: Vec<_> = self
            .pipelines
            .iter()
            .map(|pipeline| {
                let pipeline = pipeline.clone();
                let categories = self.categories.clone();
                let target = self.target_per_category;
                let cancel = cancel.clone();
                let name = pipeline.name.clone();
                let handle = tokio::spawn(async move {
                    run_pipeline(&pipeline, &categories, target, &cancel).await
                });
                (name, handle)
            })
            .collect();

        for (name, handle) in handles {
            let breakdown = handle.await.unwrap_or_else(|e| {
                tracing::error!(pipeline = %name, error = %e, "pipeline task failed");
                PipelineBreakdown {
                    pipeline: name,
                    articles_added: 0,
                    categories: Vec::new(),
                    error: Some(format!("pipeline task failed: {e}")),
                }
            });
            report.articles_added += breakdown.articles_added;
            report.per_pipeline.push(breakdown);
        }

        if cancel.is_cancelled() {
            tracing::warn!("refresh superseded, skipping maintenance");
            report.error = Some("superseded by a newer run".to_string());
            report.duration_ms = elapsed_ms(started);
            return report;
        }

        report.duplicates_cleaned = self.store.cleanup_duplicates().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "duplicate cleanup failed");
            0
        });
        report.freshness_updated = self.store.recompute_freshness().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "freshness recompute failed");
            0
        });

        report.duration_ms = elapsed_ms(started);
        tracing::info!(
            removed = report.removed,
            added = report.articles_added,
            duplicates_cleaned = report.duplicates_cleaned,
            freshness_updated = report.freshness_updated,
            duration_ms = report.duration_ms,
            "purge and refresh finished"
        );
        report
    }
}

async fn run_pipeline(
    pipeline: &Pipeline,
    categories: &[String],
    target: usize,
    cancel: &CancelSignal,
) -> PipelineBreakdown {
    let mut summaries: Vec<RunSummary> = Vec::with_capacity(categories.len());
    for category in categories {
        if cancel.is_cancelled() {
            break;
        }
        summaries.push(pipeline.orchestrator.run(category, target, true, cancel).await);
    }

    let articles_added = summaries.iter().map(|s| s.total_stored).sum();
    let mut statuses = summaries.iter().flat_map(|s| s.logs.iter().map(|l| l.status)).peekable();
    let error = if statuses.peek().is_some() && statuses.all(|s| s == FetchStatus::Error) {
        tracing::warn!(pipeline = %pipeline.name, "no source succeeded");
        Some("no source succeeded".to_string())
    } else {
        None
    };

    PipelineBreakdown {
        pipeline: pipeline.name.clone(),
        articles_added,
        categories: summaries,
        error,
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
