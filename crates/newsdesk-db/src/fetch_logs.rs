//! Database operations for `fetch_logs`.

use chrono::{DateTime, Utc};
use newsdesk_core::{FetchLogEntry, FetchStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `fetch_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FetchLogRow {
    pub id: i64,
    pub run_id: Uuid,
    pub source_name: String,
    pub category: String,
    pub articles_fetched: i32,
    pub articles_stored: i32,
    pub status: String,
    pub error_message: Option<String>,
    pub execution_time_ms: i64,
    pub logged_at: DateTime<Utc>,
}

impl TryFrom<FetchLogRow> for FetchLogEntry {
    type Error = DbError;

    fn try_from(row: FetchLogRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<FetchStatus>()
            .map_err(DbError::InvalidRow)?;
        Ok(FetchLogEntry {
            source_name: row.source_name,
            category: row.category,
            articles_fetched: u32::try_from(row.articles_fetched).unwrap_or(0),
            articles_stored: u32::try_from(row.articles_stored).unwrap_or(0),
            status,
            error_message: row.error_message,
            execution_time_ms: u64::try_from(row.execution_time_ms).unwrap_or(0),
            timestamp: row.logged_at,
        })
    }
}

/// Appends one fetch log entry under `run_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_fetch_log(
    pool: &PgPool,
    run_id: Uuid,
    entry: &FetchLogEntry,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO fetch_logs \
             (run_id, source_name, category, articles_fetched, articles_stored, \
              status, error_message, execution_time_ms, logged_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id",
    )
    .bind(run_id)
    .bind(&entry.source_name)
    .bind(&entry.category)
    .bind(i32::try_from(entry.articles_fetched).unwrap_or(i32::MAX))
    .bind(i32::try_from(entry.articles_stored).unwrap_or(i32::MAX))
    .bind(entry.status.as_str())
    .bind(entry.error_message.as_deref())
    .bind(i64::try_from(entry.execution_time_ms).unwrap_or(i64::MAX))
    .bind(entry.timestamp)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns the most recent `limit` entries, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_fetch_logs(pool: &PgPool, limit: i64) -> Result<Vec<FetchLogRow>, DbError> {
    let rows = sqlx::query_as::<_, FetchLogRow>(
        "SELECT id, run_id, source_name, category, articles_fetched, articles_stored, \
                status, error_message, execution_time_ms, logged_at \
         FROM fetch_logs \
         ORDER BY logged_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
