//! Command handlers for the CLI.
//!
//! Each handler prints a plain-text report to stdout. Source failures are
//! part of the report, not errors; only infrastructure failures propagate.

use chrono::{DateTime, Utc};
use newsdesk_core::{FetchLogEntry, PurgeReport};
use newsdesk_ingest::IngestService;

const MESSAGE_WIDTH: usize = 48;

/// Run pending migrations and report how many were applied.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub(crate) async fn run_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = newsdesk_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Ingest one category and print the per-source log.
///
/// # Errors
///
/// Returns an error if the category is empty.
pub(crate) async fn run_ingest(
    service: &IngestService,
    category: &str,
    limit: usize,
    force_refresh: bool,
) -> anyhow::Result<()> {
    let response = service.ingest(category, limit, force_refresh).await?;

    print_logs(&response.logs);
    println!(
        "\n{}: fetched {}, stored {}, refreshed {}",
        if response.success { "ok" } else { "failed" },
        response.total_fetched,
        response.total_stored,
        response.total_refreshed
    );
    if !response.success {
        anyhow::bail!("every source failed for category '{category}'");
    }
    Ok(())
}

/// Run a purge-and-refresh and print the report.
///
/// # Errors
///
/// Returns an error if the purge step failed.
pub(crate) async fn run_purge_refresh(
    service: &IngestService,
    max_age_hours: u32,
    wipe_all: bool,
) -> anyhow::Result<()> {
    let report = service.purge_and_refresh(max_age_hours, wipe_all).await;
    print_report(&report);
    if !report.success {
        anyhow::bail!(report.error.unwrap_or_else(|| "purge failed".to_string()));
    }
    Ok(())
}

/// Print the most recent fetch log entries.
///
/// # Errors
///
/// Returns an error if the log cannot be read.
pub(crate) async fn run_logs(service: &IngestService, limit: usize) -> anyhow::Result<()> {
    let logs = service.recent_logs(limit).await?;
    if logs.is_empty() {
        println!("no fetch logs yet; run `ingest` first");
        return Ok(());
    }
    print_logs(&logs);
    Ok(())
}

fn print_logs(logs: &[FetchLogEntry]) {
    println!(
        "{:<20}{:<20}{:<14}{:<9}{:<8}{:<9}{:<9}MESSAGE",
        "TIME", "SOURCE", "CATEGORY", "STATUS", "FETCHED", "STORED", "MS"
    );
    for log in logs {
        println!(
            "{:<20}{:<20}{:<14}{:<9}{:<8}{:<9}{:<9}{}",
            fmt_time(log.timestamp),
            truncate(&log.source_name, 18),
            truncate(&log.category, 12),
            log.status,
            log.articles_fetched,
            log.articles_stored,
            log.execution_time_ms,
            log.error_message
                .as_deref()
                .map(|m| truncate(m, MESSAGE_WIDTH))
                .unwrap_or_default()
        );
    }
}

fn print_report(report: &PurgeReport) {
    println!(
        "removed {} article(s), added {}, cleaned {} duplicate(s), refreshed freshness on {} in {} ms",
        report.removed,
        report.articles_added,
        report.duplicates_cleaned,
        report.freshness_updated,
        report.duration_ms
    );
    for pipeline in &report.per_pipeline {
        let categories: Vec<String> = pipeline
            .categories
            .iter()
            .map(|c| format!("{}={}", c.category, c.total_stored))
            .collect();
        println!(
            "  {:<16} added {:<5} [{}]{}",
            pipeline.pipeline,
            pipeline.articles_added,
            categories.join(", "),
            pipeline
                .error
                .as_deref()
                .map(|e| format!(" error: {e}"))
                .unwrap_or_default()
        );
    }
    if let Some(error) = &report.error {
        println!("error: {error}");
    }
}

pub(crate) fn fmt_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
