//! In-process [`ArticleStore`] and [`RunLogger`] used by tests and local
//! experiments. Every operation takes one lock, so upserts are atomic with
//! respect to each other the same way the Postgres statement is.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsdesk_core::{CanonicalArticle, FetchLogEntry, RunSummary, Scores};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{ArticleStore, RunLogger, UpsertOutcome};

#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub id: i64,
    pub article: CanonicalArticle,
    pub freshness: f64,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    articles: Vec<StoredArticle>,
    logs: Vec<(Uuid, FetchLogEntry)>,
    summaries: Vec<RunSummary>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Inserts a row without any uniqueness check, the way a racing writer
    /// could before the maintenance pass runs.
    pub fn insert_unchecked(&self, article: CanonicalArticle) -> i64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.articles.push(StoredArticle {
            id,
            article,
            freshness: 1.0,
        });
        id
    }

    #[must_use]
    pub fn articles(&self) -> Vec<StoredArticle> {
        self.lock().articles.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().articles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<RunSummary> {
        self.lock().summaries.clone()
    }

    /// Stored log entries in append order, with their run ids.
    #[must_use]
    pub fn entries(&self) -> Vec<(Uuid, FetchLogEntry)> {
        self.lock().logs.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

fn url_key(url: &str) -> String {
    url.trim_end_matches('/').to_lowercase()
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn upsert(&self, article: &CanonicalArticle) -> Result<UpsertOutcome, StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let now = Utc::now();

        if let Some(existing) = state
            .articles
            .iter_mut()
            .find(|s| s.article.content_hash == article.content_hash || s.article.url == article.url)
        {
            let row = &mut existing.article;
            row.scores = article.scores.clamped();
            row.topic_tags.clone_from(&article.topic_tags);
            row.entities.clone_from(&article.entities);
            row.reading_time_minutes = article.reading_time_minutes.max(1);
            if article.url_to_image.is_some() {
                row.url_to_image.clone_from(&article.url_to_image);
            }
            if article.description.is_some() {
                row.description.clone_from(&article.description);
            }
            if article.content.is_some() {
                row.content.clone_from(&article.content);
            }
            row.updated_at = now;
            return Ok(UpsertOutcome::Updated(existing.id));
        }

        state.next_id += 1;
        let id = state.next_id;
        let mut stored = article.clone();
        stored.scores = stored.scores.clamped();
        stored.engagement = 0;
        stored.created_at = now;
        stored.updated_at = now;
        state.articles.push(StoredArticle {
            id,
            article: stored,
            freshness: 1.0,
        });
        Ok(UpsertOutcome::Inserted(id))
    }

    async fn find_by_hash_or_url(
        &self,
        content_hash: &str,
        url: &str,
    ) -> Result<Option<i64>, StoreError> {
        self.check_available()?;
        Ok(self
            .lock()
            .articles
            .iter()
            .find(|s| s.article.content_hash == content_hash || s.article.url == url)
            .map(|s| s.id))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let before = state.articles.len();
        state.articles.retain(|s| s.article.published_at >= cutoff);
        Ok((before - state.articles.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let removed = state.articles.len() as u64;
        state.articles.clear();
        Ok(removed)
    }

    async fn cleanup_duplicates(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        state.articles.sort_by_key(|s| s.id);
        let mut hashes = BTreeSet::new();
        let mut urls = BTreeSet::new();
        let before = state.articles.len();
        state.articles.retain(|s| {
            let fresh_hash = !hashes.contains(&s.article.content_hash);
            let fresh_url = !urls.contains(&url_key(&s.article.url));
            hashes.insert(s.article.content_hash.clone());
            urls.insert(url_key(&s.article.url));
            fresh_hash && fresh_url
        });
        Ok((before - state.articles.len()) as u64)
    }

    async fn recompute_freshness(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        let now = Utc::now();
        let mut state = self.lock();
        for stored in &mut state.articles {
            stored.freshness = freshness(stored.article.published_at, now);
        }
        Ok(state.articles.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[async_trait]
impl RunLogger for MemoryStore {
    async fn append_entry(&self, run_id: Uuid, entry: &FetchLogEntry) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock().logs.push((run_id, entry.clone()));
        Ok(())
    }

    async fn append_summary(&self, summary: &RunSummary) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        if !state.summaries.iter().any(|s| s.run_id == summary.run_id) {
            state.summaries.push(summary.clone());
        }
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<FetchLogEntry>, StoreError> {
        self.check_available()?;
        let state = self.lock();
        let mut entries: Vec<(usize, &FetchLogEntry)> =
            state.logs.iter().map(|(_, e)| e).enumerate().collect();
        entries.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
        Ok(entries.into_iter().take(limit).map(|(_, e)| e.clone()).collect())
    }
}

/// `exp(-age_hours / 24)` clamped to `[0, 1]`; future dates count as age zero.
#[must_use]
pub fn freshness(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let age_hours = (now - published_at).num_seconds().max(0) as f64 / 3600.0;
    (-age_hours / 24.0).exp().clamp(0.0, 1.0)
}

/// A complete, normalized article with neutral scores, for tests and demos.
#[must_use]
pub fn sample_article(url: &str, content_hash: &str) -> CanonicalArticle {
    let now = Utc::now();
    CanonicalArticle {
        title: format!("Sample story {content_hash}"),
        description: Some("Sample description".to_string()),
        content: Some("Sample body text".to_string()),
        url: url.to_string(),
        url_to_image: None,
        source_name: "Sample Wire".to_string(),
        author: None,
        published_at: now,
        category: "general".to_string(),
        topic_tags: BTreeSet::from(["general".to_string()]),
        entities: Vec::new(),
        content_hash: content_hash.to_string(),
        reading_time_minutes: 1,
        scores: Scores::NEUTRAL,
        engagement: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Hash → id map of the current rows; handy for asserting uniqueness.
#[must_use]
pub fn ids_by_hash(store: &MemoryStore) -> HashMap<String, i64> {
    store
        .articles()
        .into_iter()
        .map(|s| (s.article.content_hash, s.id))
        .collect()
}
