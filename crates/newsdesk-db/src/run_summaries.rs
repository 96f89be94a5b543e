//! Database operations for `ingest_run_summaries`.

use chrono::{DateTime, Utc};
use newsdesk_core::RunSummary;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `ingest_run_summaries` table. `per_source` holds the
/// serialized `SourceBreakdown` list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunSummaryRow {
    pub id: i64,
    pub run_id: Uuid,
    pub category: String,
    pub total_fetched: i64,
    pub total_stored: i64,
    pub total_refreshed: i64,
    pub per_source: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Persists the aggregate for one category run.
///
/// Re-inserting the same `run_id` is a no-op.
///
/// # Errors
///
/// Returns [`DbError::InvalidRow`] if the breakdown cannot be serialized, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn insert_run_summary(pool: &PgPool, summary: &RunSummary) -> Result<(), DbError> {
    let per_source = serde_json::to_value(&summary.per_source)
        .map_err(|e| DbError::InvalidRow(e.to_string()))?;

    sqlx::query(
        "INSERT INTO ingest_run_summaries \
             (run_id, category, total_fetched, total_stored, total_refreshed, \
              per_source, started_at, duration_ms) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (run_id) DO NOTHING",
    )
    .bind(summary.run_id)
    .bind(&summary.category)
    .bind(to_i64(summary.total_fetched))
    .bind(to_i64(summary.total_stored))
    .bind(to_i64(summary.total_refreshed))
    .bind(per_source)
    .bind(summary.started_at)
    .bind(to_i64(summary.duration_ms))
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns the most recent `limit` run summaries, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_run_summaries(pool: &PgPool, limit: i64) -> Result<Vec<RunSummaryRow>, DbError> {
    let rows = sqlx::query_as::<_, RunSummaryRow>(
        "SELECT id, run_id, category, total_fetched, total_stored, total_refreshed, \
                per_source, started_at, duration_ms \
         FROM ingest_run_summaries \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
