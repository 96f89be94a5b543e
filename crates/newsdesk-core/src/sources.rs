//! Source registry: which external sources exist, how they are grouped into
//! fetch pipelines, and how publishers map to credibility tiers.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    NewsApi,
    Rss,
    Scrape,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::NewsApi => write!(f, "news_api"),
            SourceKind::Rss => write!(f, "rss"),
            SourceKind::Scrape => write!(f, "scrape"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub kind: SourceKind,
    /// Lower values are preferred. Advisory ordering only.
    pub priority: u32,
    pub endpoint: String,
    /// Canonical category → provider category (or feed path segment).
    /// An empty map serves every category under its own name.
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
    /// Scrape sources only: pages to scrape per canonical category.
    #[serde(default)]
    pub seed_urls: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SourceEntry {
    /// Map a canonical category to this source's own vocabulary.
    ///
    /// Returns `None` when the source does not serve the category.
    #[must_use]
    pub fn map_category(&self, category: &str) -> Option<String> {
        if self.kind == SourceKind::Scrape {
            return self
                .seed_urls
                .contains_key(category)
                .then(|| category.to_string());
        }
        if self.categories.is_empty() {
            return Some(category.to_string());
        }
        self.categories.get(category).cloned()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEntry {
    pub name: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredibilityTier {
    High,
    Medium,
    Low,
}

/// Publisher names grouped by credibility tier. Unknown publishers are `Low`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredibilityTable {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub low: Vec<String>,
}

impl CredibilityTable {
    #[must_use]
    pub fn tier_of(&self, source_name: &str) -> CredibilityTier {
        let key = normalize_source_name(source_name);
        let contains = |names: &[String]| names.iter().any(|n| normalize_source_name(n) == key);
        if contains(&self.high) {
            CredibilityTier::High
        } else if contains(&self.medium) {
            CredibilityTier::Medium
        } else {
            CredibilityTier::Low
        }
    }
}

/// Lowercase, strip punctuation, collapse whitespace and drop a leading "the".
#[must_use]
pub fn normalize_source_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let words = match words.split_first() {
        Some((&"the", rest)) if !rest.is_empty() => rest,
        _ => &words[..],
    };
    words.join(" ")
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub pipelines: Vec<PipelineEntry>,
    #[serde(default)]
    pub credibility: CredibilityTable,
}

impl SourcesFile {
    /// Parse and validate a registry from YAML text.
    ///
    /// When no pipelines are declared a single `default` pipeline containing
    /// every enabled source is synthesized.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the YAML is malformed or fails validation.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut file: SourcesFile = serde_yaml::from_str(content)?;
        if file.pipelines.is_empty() {
            file.pipelines.push(PipelineEntry {
                name: "default".to_string(),
                sources: file
                    .sources
                    .iter()
                    .filter(|s| s.enabled)
                    .map(|s| s.name.clone())
                    .collect(),
            });
        }
        validate_sources(&file)?;
        Ok(file)
    }

    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.name == name)
    }
}

/// Load and validate the source registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    SourcesFile::from_yaml(&content)
}

fn validate_sources(file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for source in &file.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::InvalidSources(
                "source name must be non-empty".to_string(),
            ));
        }
        if source.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidSources(format!(
                "source '{}' has an empty endpoint",
                source.name
            )));
        }
        if !seen_names.insert(source.name.to_lowercase()) {
            return Err(ConfigError::InvalidSources(format!(
                "duplicate source name: '{}'",
                source.name
            )));
        }
        if source.kind == SourceKind::Scrape && source.seed_urls.is_empty() {
            return Err(ConfigError::InvalidSources(format!(
                "scrape source '{}' declares no seed_urls",
                source.name
            )));
        }
    }

    let mut seen_pipelines = HashSet::new();
    for pipeline in &file.pipelines {
        if !seen_pipelines.insert(pipeline.name.as_str()) {
            return Err(ConfigError::InvalidSources(format!(
                "duplicate pipeline name: '{}'",
                pipeline.name
            )));
        }
        if pipeline.sources.is_empty() {
            return Err(ConfigError::InvalidSources(format!(
                "pipeline '{}' lists no sources",
                pipeline.name
            )));
        }
        for name in &pipeline.sources {
            if file.source(name).is_none() {
                return Err(ConfigError::InvalidSources(format!(
                    "pipeline '{}' references unknown source '{name}'",
                    pipeline.name
                )));
            }
        }
    }

    Ok(())
}
