//! Two-tier duplicate detection: the per-run set first, then the store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use newsdesk_core::CanonicalArticle;

use crate::error::StoreError;
use crate::store::ArticleStore;

/// Hashes and urls seen during one orchestration run. Never shared between runs.
#[derive(Debug, Default)]
pub struct RunScope {
    hashes: HashSet<String>,
    urls: HashSet<String>,
}

impl RunScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the draft's identities. Returns `false` if either was already seen.
    ///
    /// Urls compare exactly, matching the store lookup; the normalizer has
    /// already lowercased scheme and host.
    pub fn claim(&mut self, article: &CanonicalArticle) -> bool {
        if self.hashes.contains(&article.content_hash) || self.urls.contains(&article.url) {
            return false;
        }
        self.hashes.insert(article.content_hash.clone());
        self.urls.insert(article.url.clone());
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fresh,
    SeenInRun,
    AlreadyStored,
}

/// Duplicate check for one orchestration run.
///
/// With `check_store` off (refresh mode) only the in-run tier applies, so
/// existing rows flow on to the upsert and get refreshed.
pub struct Deduplicator {
    store: Arc<dyn ArticleStore>,
    scope: Mutex<RunScope>,
    check_store: bool,
}

impl Deduplicator {
    #[must_use]
    pub fn new(store: Arc<dyn ArticleStore>, check_store: bool) -> Self {
        Self {
            store,
            scope: Mutex::new(RunScope::new()),
            check_store,
        }
    }

    /// Classifies the draft. A draft is claimed in the run scope before the
    /// store round-trip, so a repeat later in the run never reaches the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lookup fails.
    pub async fn check(&self, draft: &CanonicalArticle) -> Result<Verdict, StoreError> {
        let claimed = self
            .scope
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .claim(draft);
        if !claimed {
            return Ok(Verdict::SeenInRun);
        }
        if self.check_store
            && self
                .store
                .find_by_hash_or_url(&draft.content_hash, &draft.url)
                .await?
                .is_some()
        {
            return Ok(Verdict::AlreadyStored);
        }
        Ok(Verdict::Fresh)
    }
}
