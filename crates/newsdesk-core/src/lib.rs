//! Shared domain types and configuration for newsdesk.

pub mod app_config;
pub mod article;
pub mod config;
pub mod fetch_log;
pub mod sources;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use article::{CanonicalArticle, Scores};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use fetch_log::{
    FetchLogEntry, FetchStatus, PipelineBreakdown, PurgeReport, RunSummary, SourceBreakdown,
};
pub use sources::{
    load_sources, normalize_source_name, CredibilityTable, CredibilityTier, PipelineEntry,
    SourceEntry, SourceKind, SourcesFile,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("invalid sources configuration: {0}")]
    InvalidSources(String),
}
