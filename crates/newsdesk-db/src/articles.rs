//! Database operations for the `articles` table.
//!
//! An article is identified by either its `content_hash` or its `url`; both
//! carry unique constraints. Ingestion upserts against whichever identity
//! matches first and never touches `engagement`.

use chrono::{DateTime, Utc};
use newsdesk_core::{CanonicalArticle, Scores};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `articles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub source_name: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub category: String,
    pub topic_tags: Vec<String>,
    pub entities: Vec<String>,
    pub content_hash: String,
    pub reading_time_minutes: i32,
    pub content_quality: Decimal,
    pub credibility: Decimal,
    pub bias: Decimal,
    pub sentiment: Decimal,
    pub engagement: i64,
    pub freshness_score: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArticleRow {
    /// Scores as stored, widened back to `f64`.
    #[must_use]
    pub fn scores(&self) -> Scores {
        Scores {
            content_quality: self.content_quality.to_f64().unwrap_or(0.0),
            credibility: self.credibility.to_f64().unwrap_or(0.0),
            bias: self.bias.to_f64().unwrap_or(0.0),
            sentiment: self.sentiment.to_f64().unwrap_or(0.0),
        }
    }
}

/// Identity columns of an existing article, used for store-tier dedup.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ArticleMatch {
    pub id: i64,
    pub content_hash: String,
    pub url: String,
}

/// Result of [`upsert_article`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct UpsertedArticle {
    pub id: i64,
    /// `true` when a new row was created, `false` when an existing row was refreshed.
    pub inserted: bool,
}

const ARTICLE_COLUMNS: &str = "id, title, description, content, url, url_to_image, source_name, \
     author, published_at, category, topic_tags, entities, content_hash, reading_time_minutes, \
     content_quality, credibility, bias, sentiment, engagement, freshness_score, \
     created_at, updated_at";

// The UPDATE branch targets the earliest row matching either identity. The
// INSERT branch only runs when nothing matched and swallows a concurrent
// insert via ON CONFLICT DO NOTHING, in which case neither branch returns a row.
const UPSERT_SQL: &str = "\
WITH target AS (
    SELECT id FROM articles
    WHERE content_hash = $12 OR url = $4
    ORDER BY id
    LIMIT 1
),
updated AS (
    UPDATE articles SET
        description          = COALESCE($2, description),
        content              = COALESCE($3, content),
        url_to_image         = COALESCE($5, url_to_image),
        topic_tags           = $10::TEXT[],
        entities             = $11::TEXT[],
        reading_time_minutes = $13,
        content_quality      = $14::NUMERIC(4,3),
        credibility          = $15::NUMERIC(4,3),
        bias                 = $16::NUMERIC(4,3),
        sentiment            = $17::NUMERIC(4,3),
        updated_at           = NOW()
    WHERE id = (SELECT id FROM target)
    RETURNING id, false AS inserted
),
inserted AS (
    INSERT INTO articles (
        title, description, content, url, url_to_image, source_name, author,
        published_at, category, topic_tags, entities, content_hash,
        reading_time_minutes, content_quality, credibility, bias, sentiment
    )
    SELECT $1, $2, $3, $4, $5, $6, $7, $8::TIMESTAMPTZ, $9, $10::TEXT[], $11::TEXT[], $12, $13,
           $14::NUMERIC(4,3), $15::NUMERIC(4,3), $16::NUMERIC(4,3), $17::NUMERIC(4,3)
    WHERE NOT EXISTS (SELECT 1 FROM target)
    ON CONFLICT DO NOTHING
    RETURNING id, true AS inserted
)
SELECT id, inserted FROM updated
UNION ALL
SELECT id, inserted FROM inserted
LIMIT 1";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts the article, or refreshes the existing row that shares its
/// `content_hash` or `url`.
///
/// A refresh rewrites scores, tags, entities and reading time, fills in
/// description, content and image only when the incoming value is present,
/// and leaves `engagement`, `published_at` and `created_at` untouched.
///
/// # Errors
///
/// Returns [`DbError::UpsertConflict`] if a concurrent writer won the
/// uniqueness race on both attempts, or [`DbError::Sqlx`] on query failure.
pub async fn upsert_article(
    pool: &PgPool,
    article: &CanonicalArticle,
) -> Result<UpsertedArticle, DbError> {
    // A lost race leaves the competing row visible to the second attempt,
    // which then takes the UPDATE branch.
    for _ in 0..2 {
        if let Some(outcome) = try_upsert(pool, article).await? {
            return Ok(outcome);
        }
    }
    Err(DbError::UpsertConflict {
        url: article.url.clone(),
    })
}

async fn try_upsert(
    pool: &PgPool,
    article: &CanonicalArticle,
) -> Result<Option<UpsertedArticle>, DbError> {
    let tags: Vec<&str> = article.topic_tags.iter().map(String::as_str).collect();
    let reading_time = i32::try_from(article.reading_time_minutes.max(1)).unwrap_or(i32::MAX);
    let scores = article.scores.clamped();

    let row = sqlx::query_as::<_, UpsertedArticle>(UPSERT_SQL)
        .bind(&article.title)
        .bind(article.description.as_deref())
        .bind(article.content.as_deref())
        .bind(&article.url)
        .bind(article.url_to_image.as_deref())
        .bind(&article.source_name)
        .bind(article.author.as_deref())
        .bind(article.published_at)
        .bind(&article.category)
        .bind(&tags)
        .bind(&article.entities)
        .bind(&article.content_hash)
        .bind(reading_time)
        .bind(scores.content_quality)
        .bind(scores.credibility)
        .bind(scores.bias)
        .bind(scores.sentiment)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Deletes articles published before `cutoff`. Returns the number removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_articles_older_than(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM articles WHERE published_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes every article. Returns the number removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_all_articles(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM articles").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Removes rows that duplicate an earlier row by `content_hash` or by
/// normalized url (case-insensitive, trailing slash ignored). The row with
/// the lowest `id` survives.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn cleanup_duplicate_articles(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM articles a \
         USING articles b \
         WHERE a.id > b.id \
           AND (a.content_hash = b.content_hash \
                OR lower(rtrim(a.url, '/')) = lower(rtrim(b.url, '/')))",
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Recomputes `freshness_score = exp(-age_hours / 24)` for every article.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn recompute_freshness(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE articles \
         SET freshness_score = LEAST(1.0, GREATEST(0.0, EXP( \
                 -GREATEST(EXTRACT(EPOCH FROM (NOW() - published_at))::DOUBLE PRECISION, 0.0) \
                 / 86400.0)))::NUMERIC(4,3)",
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Looks up an existing article by `content_hash` or `url`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_article_by_hash_or_url(
    pool: &PgPool,
    content_hash: &str,
    url: &str,
) -> Result<Option<ArticleMatch>, DbError> {
    let row = sqlx::query_as::<_, ArticleMatch>(
        "SELECT id, content_hash, url \
         FROM articles \
         WHERE content_hash = $1 OR url = $2 \
         ORDER BY id \
         LIMIT 1",
    )
    .bind(content_hash)
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetches a full article row by url.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the url, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_article_by_url(pool: &PgPool, url: &str) -> Result<ArticleRow, DbError> {
    let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE url = $1");
    sqlx::query_as::<_, ArticleRow>(&sql)
        .bind(url)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_articles(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
