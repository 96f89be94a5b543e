//! Live integration tests for newsdesk-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/newsdesk-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use newsdesk_core::{
    CanonicalArticle, FetchLogEntry, FetchStatus, RunSummary, Scores, SourceBreakdown,
};
use newsdesk_db::{
    cleanup_duplicate_articles, count_articles, delete_all_articles, delete_articles_older_than,
    find_article_by_hash_or_url, get_article_by_url, insert_fetch_log, insert_run_summary,
    list_recent_fetch_logs, list_run_summaries, recompute_freshness, upsert_article,
};
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_article(url: &str, hash: &str) -> CanonicalArticle {
    let now = Utc::now();
    CanonicalArticle {
        title: format!("Headline for {hash}"),
        description: Some("A short summary".to_string()),
        content: Some("Body text of the article".to_string()),
        url: url.to_string(),
        url_to_image: Some("https://cdn.example.com/a.jpg".to_string()),
        source_name: "Reuters".to_string(),
        author: Some("Staff".to_string()),
        published_at: now,
        category: "technology".to_string(),
        topic_tags: BTreeSet::from(["technology".to_string()]),
        entities: vec!["Apple".to_string()],
        content_hash: hash.to_string(),
        reading_time_minutes: 2,
        scores: Scores::NEUTRAL,
        engagement: 0,
        created_at: now,
        updated_at: now,
    }
}

fn make_log(source: &str, status: FetchStatus) -> FetchLogEntry {
    FetchLogEntry {
        source_name: source.to_string(),
        category: "technology".to_string(),
        articles_fetched: 3,
        articles_stored: 2,
        status,
        error_message: None,
        execution_time_ms: 120,
        timestamp: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// articles
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_inserts_then_refreshes_same_hash(pool: sqlx::PgPool) {
    let article = make_article("https://example.com/a", "hash-a");
    let first = upsert_article(&pool, &article).await.expect("insert");
    assert!(first.inserted);

    let mut rescored = article.clone();
    rescored.scores = Scores {
        credibility: 0.9,
        ..Scores::NEUTRAL
    };
    let second = upsert_article(&pool, &rescored).await.expect("refresh");
    assert!(!second.inserted);
    assert_eq!(first.id, second.id);
    assert_eq!(count_articles(&pool).await.unwrap(), 1);

    let row = get_article_by_url(&pool, "https://example.com/a").await.unwrap();
    assert!((row.scores().credibility - 0.9).abs() < 1e-9);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_matches_on_url_when_hash_differs(pool: sqlx::PgPool) {
    let first = upsert_article(&pool, &make_article("https://example.com/a", "hash-a"))
        .await
        .unwrap();
    let second = upsert_article(&pool, &make_article("https://example.com/a", "hash-b"))
        .await
        .unwrap();

    assert!(!second.inserted);
    assert_eq!(first.id, second.id);
    assert_eq!(count_articles(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_preserves_engagement_and_existing_image(pool: sqlx::PgPool) {
    let article = make_article("https://example.com/a", "hash-a");
    upsert_article(&pool, &article).await.unwrap();
    sqlx::query("UPDATE articles SET engagement = 17 WHERE url = $1")
        .bind(&article.url)
        .execute(&pool)
        .await
        .unwrap();

    let mut without_image = article.clone();
    without_image.url_to_image = None;
    without_image.engagement = 0;
    upsert_article(&pool, &without_image).await.unwrap();

    let row = get_article_by_url(&pool, &article.url).await.unwrap();
    assert_eq!(row.engagement, 17);
    assert_eq!(row.url_to_image.as_deref(), Some("https://cdn.example.com/a.jpg"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_by_hash_or_url_matches_either_identity(pool: sqlx::PgPool) {
    upsert_article(&pool, &make_article("https://example.com/a", "hash-a"))
        .await
        .unwrap();

    let by_hash = find_article_by_hash_or_url(&pool, "hash-a", "https://other.example.com")
        .await
        .unwrap();
    let by_url = find_article_by_hash_or_url(&pool, "nope", "https://example.com/a")
        .await
        .unwrap();
    let neither = find_article_by_hash_or_url(&pool, "nope", "https://other.example.com")
        .await
        .unwrap();

    assert!(by_hash.is_some());
    assert_eq!(by_hash, by_url);
    assert!(neither.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_older_than_removes_only_stale_rows(pool: sqlx::PgPool) {
    let mut stale = make_article("https://example.com/old", "old");
    stale.published_at = Utc::now() - Duration::hours(72);
    upsert_article(&pool, &stale).await.unwrap();
    upsert_article(&pool, &make_article("https://example.com/new", "new"))
        .await
        .unwrap();

    let removed = delete_articles_older_than(&pool, Utc::now() - Duration::hours(48))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(get_article_by_url(&pool, "https://example.com/new").await.is_ok());

    assert_eq!(delete_all_articles(&pool).await.unwrap(), 1);
    assert_eq!(count_articles(&pool).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn cleanup_duplicates_keeps_earliest_row(pool: sqlx::PgPool) {
    let keep = upsert_article(&pool, &make_article("https://Example.com/story", "h1"))
        .await
        .unwrap();
    // Differs only by case and trailing slash, so the unique constraint lets it in.
    upsert_article(&pool, &make_article("https://example.com/story/", "h2"))
        .await
        .unwrap();
    upsert_article(&pool, &make_article("https://example.com/other", "h3"))
        .await
        .unwrap();

    let removed = cleanup_duplicate_articles(&pool).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(count_articles(&pool).await.unwrap(), 2);
    let survivor = get_article_by_url(&pool, "https://Example.com/story").await.unwrap();
    assert_eq!(survivor.id, keep.id);

    assert_eq!(cleanup_duplicate_articles(&pool).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn recompute_freshness_decays_with_age(pool: sqlx::PgPool) {
    let mut day_old = make_article("https://example.com/day", "day");
    day_old.published_at = Utc::now() - Duration::hours(24);
    upsert_article(&pool, &day_old).await.unwrap();
    upsert_article(&pool, &make_article("https://example.com/now", "now"))
        .await
        .unwrap();

    let updated = recompute_freshness(&pool).await.unwrap();
    assert_eq!(updated, 2);

    let fresh = get_article_by_url(&pool, "https://example.com/now").await.unwrap();
    let aged = get_article_by_url(&pool, "https://example.com/day").await.unwrap();
    let fresh_score = fresh.freshness_score.to_f64().unwrap();
    let aged_score = aged.freshness_score.to_f64().unwrap();
    assert!(fresh_score > 0.99);
    assert!((aged_score - (-1.0_f64).exp()).abs() < 0.01);
}

// ---------------------------------------------------------------------------
// fetch_logs and run summaries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_logs_list_newest_first(pool: sqlx::PgPool) {
    let run_id = Uuid::new_v4();
    let mut older = make_log("headlines", FetchStatus::Success);
    older.timestamp = Utc::now() - Duration::minutes(5);
    insert_fetch_log(&pool, run_id, &older).await.unwrap();
    insert_fetch_log(&pool, run_id, &make_log("wire-rss", FetchStatus::NoData))
        .await
        .unwrap();

    let rows = list_recent_fetch_logs(&pool, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].source_name, "wire-rss");
    assert_eq!(rows[0].status, "no_data");
    assert_eq!(rows[1].run_id, run_id);

    let limited = list_recent_fetch_logs(&pool, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn run_summary_insert_is_idempotent(pool: sqlx::PgPool) {
    let per_source = vec![SourceBreakdown {
        source_name: "headlines".to_string(),
        fetched: 10,
        stored: 6,
        ..SourceBreakdown::default()
    }];
    let summary = RunSummary::from_parts(
        Uuid::new_v4(),
        "technology",
        Utc::now(),
        1_250,
        per_source,
        vec![],
    );

    insert_run_summary(&pool, &summary).await.unwrap();
    insert_run_summary(&pool, &summary).await.unwrap();

    let rows = list_run_summaries(&pool, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_fetched, 10);
    assert_eq!(rows[0].total_stored, 6);
    assert_eq!(rows[0].per_source[0]["source_name"], "headlines");
}
