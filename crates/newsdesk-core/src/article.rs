use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quality, credibility, bias and sentiment scores for one article.
///
/// Every field is expected to lie in `[0.0, 1.0]`; [`Scores::clamped`] enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub content_quality: f64,
    pub credibility: f64,
    pub bias: f64,
    pub sentiment: f64,
}

impl Scores {
    /// Neutral scores used before a scorer has run.
    pub const NEUTRAL: Scores = Scores {
        content_quality: 0.5,
        credibility: 0.5,
        bias: 0.5,
        sentiment: 0.5,
    };

    /// Clamp every field to `[0.0, 1.0]`. `NaN` becomes `0.0`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            content_quality: clamp_unit(self.content_quality),
            credibility: clamp_unit(self.credibility),
            bias: clamp_unit(self.bias),
            sentiment: clamp_unit(self.sentiment),
        }
    }

    /// `true` when all four scores are finite and within `[0.0, 1.0]`.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        [
            self.content_quality,
            self.credibility,
            self.bias,
            self.sentiment,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }
}

impl Default for Scores {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The normalized, deduplicated, scored article record persisted by the store.
///
/// Identity is `content_hash` (derived from title + url) and `url`; both are
/// unique in the store. `engagement` is an accumulated counter owned by the
/// store and is never overwritten by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalArticle {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub source_name: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub category: String,
    pub topic_tags: BTreeSet<String>,
    pub entities: Vec<String>,
    pub content_hash: String,
    pub reading_time_minutes: u32,
    pub scores: Scores,
    pub engagement: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanonicalArticle {
    /// Text used by scorers and taggers: title followed by description.
    #[must_use]
    pub fn headline_text(&self) -> String {
        match self.description.as_deref() {
            Some(desc) if !desc.is_empty() => format!("{} {desc}", self.title),
            _ => self.title.clone(),
        }
    }

    /// Body text, falling back to the description when no content was provided.
    #[must_use]
    pub fn body_text(&self) -> &str {
        self.content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or(self.description.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(description: Option<&str>, content: Option<&str>) -> CanonicalArticle {
        let now = Utc::now();
        CanonicalArticle {
            title: "Markets rally".to_string(),
            description: description.map(ToString::to_string),
            content: content.map(ToString::to_string),
            url: "https://example.com/a".to_string(),
            url_to_image: None,
            source_name: "Example".to_string(),
            author: None,
            published_at: now,
            category: "business".to_string(),
            topic_tags: BTreeSet::new(),
            entities: Vec::new(),
            content_hash: "abc".to_string(),
            reading_time_minutes: 1,
            scores: Scores::NEUTRAL,
            engagement: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn clamped_bounds_every_field() {
        let scores = Scores {
            content_quality: 1.7,
            credibility: -0.2,
            bias: f64::NAN,
            sentiment: 0.4,
        }
        .clamped();
        assert!(scores.is_bounded());
        assert_eq!(scores.content_quality, 1.0);
        assert_eq!(scores.credibility, 0.0);
        assert_eq!(scores.bias, 0.0);
        assert_eq!(scores.sentiment, 0.4);
    }

    #[test]
    fn is_bounded_rejects_nan() {
        let scores = Scores {
            sentiment: f64::NAN,
            ..Scores::NEUTRAL
        };
        assert!(!scores.is_bounded());
    }

    #[test]
    fn headline_text_joins_title_and_description() {
        assert_eq!(
            article(Some("Stocks climb"), None).headline_text(),
            "Markets rally Stocks climb"
        );
        assert_eq!(article(None, None).headline_text(), "Markets rally");
    }

    #[test]
    fn body_text_falls_back_to_description() {
        assert_eq!(article(Some("desc"), Some("  ")).body_text(), "desc");
        assert_eq!(article(Some("desc"), Some("body")).body_text(), "body");
        assert_eq!(article(None, None).body_text(), "");
    }
}
