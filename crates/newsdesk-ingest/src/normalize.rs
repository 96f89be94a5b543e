//! Raw item → canonical article draft.
//!
//! A draft carries neutral scores until the scorer runs.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use newsdesk_core::{CanonicalArticle, Scores};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::types::RawItem;

const MAX_TOPIC_TAGS: usize = 5;
const MAX_ENTITIES: usize = 10;
const WORDS_PER_MINUTE: usize = 200;
/// Hex characters of the SHA-256 digest kept as the content hash (128 bits).
const CONTENT_HASH_LEN: usize = 32;
const FALLBACK_TAG: &str = "general";

/// Tag → keywords matched case-insensitively against title + description.
const TOPIC_VOCABULARY: &[(&str, &[&str])] = &[
    ("politics", &["politic", "election", "senate", "congress", "parliament", "president", "governor", "minister", "campaign", "legislat"]),
    ("technology", &["technolog", "software", "startup", " ai ", "artificial intelligence", "chip", "semiconductor", "smartphone", "cyber", "robot"]),
    ("business", &["business", "market", "stock", "economy", "economic", "earnings", "revenue", "investor", "merger", "inflation"]),
    ("health", &["health", "medical", "hospital", "disease", "vaccine", "virus", "patient", "drug", "mental health", "cancer"]),
    ("sports", &["sport", "football", "soccer", "basketball", "baseball", "tennis", "olympic", "championship", "league", "tournament"]),
    ("entertainment", &["entertainment", "movie", "film", "music", "celebrity", "television", "streaming", "album", "box office", "hollywood"]),
    ("science", &["science", "scientist", "research", "study finds", "space", "nasa", "climate", "physics", "biology", "astronom"]),
];

const ENTITY_STOPWORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "he", "her", "his", "how", "i", "if",
    "in", "is", "it", "its", "new", "no", "not", "of", "on", "or", "our", "she", "so", "that",
    "the", "their", "there", "they", "this", "to", "up", "was", "we", "what", "when", "where",
    "who", "why", "will", "with", "you", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "breaking", "update", "live", "watch", "exclusive",
];

static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][\p{L}'&-]*(?:[ \t]+[A-Z][\p{L}'&-]*)*").expect("valid entity regex")
});

/// Why an item could not become an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingTitle,
    MissingUrl,
    InvalidUrl,
    /// Neither content nor description.
    MissingBody,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::MissingTitle => "missing title",
            Rejection::MissingUrl => "missing url",
            Rejection::InvalidUrl => "url is not http(s)",
            Rejection::MissingBody => "missing content and description",
        };
        f.write_str(reason)
    }
}

/// Normalize one raw item fetched for `category`.
///
/// `source_name` is used when the provider did not label the publisher.
///
/// # Errors
///
/// Returns a [`Rejection`] if the item lacks a title, a usable url, or any body text.
pub fn normalize(
    raw: RawItem,
    category: &str,
    source_name: &str,
    now: DateTime<Utc>,
) -> Result<CanonicalArticle, Rejection> {
    let title = clean(raw.title).ok_or(Rejection::MissingTitle)?;
    let url = clean(raw.url).ok_or(Rejection::MissingUrl)?;
    let url = canonical_url(&url).ok_or(Rejection::InvalidUrl)?;
    let description = clean(raw.description);
    let content = clean(raw.content);
    if description.is_none() && content.is_none() {
        return Err(Rejection::MissingBody);
    }

    let url_to_image = clean(raw.image)
        .or_else(|| clean(raw.thumbnail))
        .or_else(|| clean(raw.page_image));

    let mut article = CanonicalArticle {
        content_hash: content_hash(&title, &url),
        topic_tags: BTreeSet::new(),
        entities: Vec::new(),
        reading_time_minutes: 0,
        title,
        description,
        content,
        url,
        url_to_image,
        source_name: clean(raw.source_label).unwrap_or_else(|| source_name.to_string()),
        author: clean(raw.author),
        published_at: raw.published_at.unwrap_or(now),
        category: category.to_string(),
        scores: Scores::NEUTRAL,
        engagement: 0,
        created_at: now,
        updated_at: now,
    };

    let headline = article.headline_text();
    article.topic_tags = topic_tags(&headline);
    article.entities = extract_entities(&headline);
    article.reading_time_minutes = reading_time_minutes(article.body_text());
    Ok(article)
}

/// Stable dedup identity: truncated hex SHA-256 of `title|url`.
#[must_use]
pub fn content_hash(title: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(CONTENT_HASH_LEN);
    hex
}

#[must_use]
pub fn topic_tags(text: &str) -> BTreeSet<String> {
    let haystack = format!(" {} ", text.to_lowercase());
    let mut tags: BTreeSet<String> = TOPIC_VOCABULARY
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(tag, _)| (*tag).to_string())
        .take(MAX_TOPIC_TAGS)
        .collect();
    if tags.is_empty() {
        tags.insert(FALLBACK_TAG.to_string());
    }
    tags
}

/// `ceil(words / 200)`, at least one minute.
#[must_use]
pub fn reading_time_minutes(body: &str) -> u32 {
    let words = body.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Runs of capitalized words, minus leading stopwords, first-seen order.
#[must_use]
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    for run in CAPITALIZED_RUN.find_iter(text) {
        let words: Vec<&str> = run
            .as_str()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .skip_while(|w| is_stopword(w))
            .collect();
        let entity = words.join(" ");
        if entity.chars().count() < 2 || is_stopword(&entity) || entities.contains(&entity) {
            continue;
        }
        entities.push(entity);
        if entities.len() >= MAX_ENTITIES {
            break;
        }
    }
    entities
}

fn is_stopword(word: &str) -> bool {
    let lower = word.to_lowercase();
    ENTITY_STOPWORDS.contains(&lower.as_str())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parsed http(s) url with scheme and host lowercased. Path case is kept.
fn canonical_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    (matches!(parsed.scheme(), "http" | "https") && parsed.has_host()).then(|| parsed.to_string())
}
