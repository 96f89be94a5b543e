//! Persistence seams: the article store and the run logger, plus their
//! Postgres implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsdesk_core::{CanonicalArticle, FetchLogEntry, RunSummary};
use newsdesk_db::DbError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
}

impl UpsertOutcome {
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            UpsertOutcome::Inserted(id) | UpsertOutcome::Updated(id) => id,
        }
    }
}

/// Idempotent article persistence keyed by content hash OR url.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Atomically inserts the article or refreshes the row sharing its hash
    /// or url. Engagement and identity of an existing row are preserved.
    async fn upsert(&self, article: &CanonicalArticle) -> Result<UpsertOutcome, StoreError>;

    /// Id of a stored article matching either identity.
    async fn find_by_hash_or_url(&self, content_hash: &str, url: &str)
        -> Result<Option<i64>, StoreError>;

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn delete_all(&self) -> Result<u64, StoreError>;

    async fn cleanup_duplicates(&self) -> Result<u64, StoreError>;

    async fn recompute_freshness(&self) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Append-only sink for fetch log entries and run summaries.
#[async_trait]
pub trait RunLogger: Send + Sync {
    async fn append_entry(&self, run_id: Uuid, entry: &FetchLogEntry) -> Result<(), StoreError>;

    async fn append_summary(&self, summary: &RunSummary) -> Result<(), StoreError>;

    /// Most recent entries, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<FetchLogEntry>, StoreError>;
}

/// [`ArticleStore`] and [`RunLogger`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn from_db(err: DbError) -> StoreError {
    match err {
        DbError::UpsertConflict { url } => StoreError::Conflict(url),
        DbError::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => {
            StoreError::Unavailable("connection pool exhausted or closed".to_string())
        }
        other => StoreError::Db(other),
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn upsert(&self, article: &CanonicalArticle) -> Result<UpsertOutcome, StoreError> {
        let row = newsdesk_db::upsert_article(&self.pool, article)
            .await
            .map_err(from_db)?;
        Ok(if row.inserted {
            UpsertOutcome::Inserted(row.id)
        } else {
            UpsertOutcome::Updated(row.id)
        })
    }

    async fn find_by_hash_or_url(
        &self,
        content_hash: &str,
        url: &str,
    ) -> Result<Option<i64>, StoreError> {
        let found = newsdesk_db::find_article_by_hash_or_url(&self.pool, content_hash, url)
            .await
            .map_err(from_db)?;
        Ok(found.map(|m| m.id))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        newsdesk_db::delete_articles_older_than(&self.pool, cutoff)
            .await
            .map_err(from_db)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        newsdesk_db::delete_all_articles(&self.pool)
            .await
            .map_err(from_db)
    }

    async fn cleanup_duplicates(&self) -> Result<u64, StoreError> {
        newsdesk_db::cleanup_duplicate_articles(&self.pool)
            .await
            .map_err(from_db)
    }

    async fn recompute_freshness(&self) -> Result<u64, StoreError> {
        newsdesk_db::recompute_freshness(&self.pool)
            .await
            .map_err(from_db)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        newsdesk_db::health_check(&self.pool)
            .await
            .map_err(from_db)
    }
}

#[async_trait]
impl RunLogger for PgStore {
    async fn append_entry(&self, run_id: Uuid, entry: &FetchLogEntry) -> Result<(), StoreError> {
        newsdesk_db::insert_fetch_log(&self.pool, run_id, entry)
            .await
            .map_err(from_db)?;
        Ok(())
    }

    async fn append_summary(&self, summary: &RunSummary) -> Result<(), StoreError> {
        newsdesk_db::insert_run_summary(&self.pool, summary)
            .await
            .map_err(from_db)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<FetchLogEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = newsdesk_db::list_recent_fetch_logs(&self.pool, limit)
            .await
            .map_err(from_db)?;
        rows.into_iter()
            .map(|row| FetchLogEntry::try_from(row).map_err(from_db))
            .collect()
    }
}
