//! Quality scoring for articles that survived deduplication.

use newsdesk_core::{CanonicalArticle, CredibilityTable, CredibilityTier, Scores};

/// Computes the four bounded scores for an article.
///
/// Implementations must be deterministic for identical input. Callers clamp
/// the result, so a classifier returning slightly out-of-range values is
/// still stored safely.
pub trait QualityScorer: Send + Sync {
    fn score(&self, article: &CanonicalArticle) -> Scores;
}

/// Word weights for the sentiment lexicon.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("agreement", 0.4),
    ("breakthrough", 0.5),
    ("celebrate", 0.4),
    ("gains", 0.3),
    ("good", 0.3),
    ("growth", 0.3),
    ("improve", 0.3),
    ("improved", 0.3),
    ("praised", 0.4),
    ("record", 0.2),
    ("recovery", 0.4),
    ("rescued", 0.5),
    ("success", 0.5),
    ("successful", 0.5),
    ("surge", 0.3),
    ("win", 0.4),
    ("wins", 0.4),
    ("victory", 0.5),
    // Negative signals
    ("attack", -0.5),
    ("crash", -0.6),
    ("crisis", -0.6),
    ("dead", -0.7),
    ("death", -0.6),
    ("decline", -0.3),
    ("disaster", -0.7),
    ("failed", -0.4),
    ("failure", -0.4),
    ("fear", -0.4),
    ("killed", -0.7),
    ("lawsuit", -0.5),
    ("loss", -0.4),
    ("losses", -0.4),
    ("recall", -0.5),
    ("scandal", -0.6),
    ("slump", -0.4),
    ("warning", -0.4),
];

/// Emotionally loaded wording; each hit nudges the bias score up.
const LOADED_WORDS: &[&str] = &[
    "absurd",
    "catastrophic",
    "destroy",
    "destroyed",
    "disgraceful",
    "outrage",
    "outrageous",
    "radical",
    "ridiculous",
    "shameful",
    "shocking",
    "slams",
    "unbelievable",
    "horrifying",
];

const ATTRIBUTION_PHRASES: &[&str] = &["according to", "said", "reported", "told"];

const QUALITY_BASE: f64 = 0.5;
const QUALITY_STEP: f64 = 0.1;
const LONG_CONTENT_CHARS: usize = 500;
const BIAS_PER_HIT: f64 = 0.15;

/// Score a text string using the sentiment lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

/// Deterministic heuristic scorer backed by a credibility table.
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    credibility: CredibilityTable,
}

impl HeuristicScorer {
    #[must_use]
    pub fn new(credibility: CredibilityTable) -> Self {
        Self { credibility }
    }

    #[must_use]
    pub fn content_quality(article: &CanonicalArticle) -> f64 {
        let content = article.content.as_deref().unwrap_or("");
        let title_len = article.title.chars().count();
        let lowered = content.to_lowercase();

        let signals = [
            content.chars().count() > LONG_CONTENT_CHARS,
            (20..=100).contains(&title_len),
            ATTRIBUTION_PHRASES.iter().any(|p| lowered.contains(p)),
            !is_shouty(&article.title),
        ];
        let hits = signals.iter().filter(|s| **s).count();
        #[allow(clippy::cast_precision_loss)]
        let quality = QUALITY_BASE + QUALITY_STEP * hits as f64;
        quality.min(1.0)
    }

    #[must_use]
    pub fn credibility(&self, source_name: &str) -> f64 {
        match self.credibility.tier_of(source_name) {
            CredibilityTier::High => 0.9,
            CredibilityTier::Medium => 0.7,
            CredibilityTier::Low => 0.5,
        }
    }
}

impl QualityScorer for HeuristicScorer {
    fn score(&self, article: &CanonicalArticle) -> Scores {
        let text = scoring_text(article);
        let loaded_hits = text
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase())
            .filter(|w| LOADED_WORDS.contains(&w.as_str()))
            .count();

        #[allow(clippy::cast_precision_loss)]
        let bias = (loaded_hits as f64 * BIAS_PER_HIT).min(1.0);
        let sentiment = (f64::from(lexicon_score(&text)) + 1.0) / 2.0;

        Scores {
            content_quality: Self::content_quality(article),
            credibility: self.credibility(&article.source_name),
            bias,
            sentiment,
        }
        .clamped()
    }
}

fn scoring_text(article: &CanonicalArticle) -> String {
    [
        Some(article.title.as_str()),
        article.description.as_deref(),
        article.content.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

/// Exclamation marks or an all-caps word of four or more letters.
fn is_shouty(title: &str) -> bool {
    title.contains('!')
        || title.split_whitespace().any(|w| {
            let letters: Vec<char> = w.chars().filter(|c| c.is_alphabetic()).collect();
            letters.len() >= 4 && letters.iter().all(|c| c.is_uppercase())
        })
}
