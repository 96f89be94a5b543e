//! Write-once observability records produced by ingestion runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one adapter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Success,
    Error,
    NoData,
}

impl FetchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FetchStatus::Success => "success",
            FetchStatus::Error => "error",
            FetchStatus::NoData => "no_data",
        }
    }
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FetchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(FetchStatus::Success),
            "error" => Ok(FetchStatus::Error),
            "no_data" => Ok(FetchStatus::NoData),
            other => Err(format!("unknown fetch status '{other}'")),
        }
    }
}

/// Immutable record of one adapter invocation within a category run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub source_name: String,
    pub category: String,
    pub articles_fetched: u32,
    pub articles_stored: u32,
    pub status: FetchStatus,
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Per-source counters for one category run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub source_name: String,
    pub fetched: u32,
    pub stored: u32,
    pub refreshed: u32,
    pub rejected: u32,
    pub duplicates: u32,
    pub failed: u32,
}

/// Aggregate of the fetch log entries produced by one orchestration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_fetched: u64,
    pub total_stored: u64,
    pub total_refreshed: u64,
    pub per_source: Vec<SourceBreakdown>,
    pub logs: Vec<FetchLogEntry>,
}

impl RunSummary {
    /// Build a summary from per-source breakdowns and their log entries.
    ///
    /// Totals are plain sums, so the result does not depend on the order the
    /// breakdowns were produced in.
    #[must_use]
    pub fn from_parts(
        run_id: Uuid,
        category: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        per_source: Vec<SourceBreakdown>,
        logs: Vec<FetchLogEntry>,
    ) -> Self {
        let total_fetched = per_source.iter().map(|s| u64::from(s.fetched)).sum();
        let total_stored = per_source.iter().map(|s| u64::from(s.stored)).sum();
        let total_refreshed = per_source.iter().map(|s| u64::from(s.refreshed)).sum();
        Self {
            run_id,
            category: category.to_string(),
            started_at,
            duration_ms,
            total_fetched,
            total_stored,
            total_refreshed,
            per_source,
            logs,
        }
    }

    /// Log entry for a named source, if that source ran.
    #[must_use]
    pub fn log_for(&self, source_name: &str) -> Option<&FetchLogEntry> {
        self.logs.iter().find(|l| l.source_name == source_name)
    }
}

/// One fetch pipeline's contribution to a purge-and-refresh run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineBreakdown {
    pub pipeline: String,
    pub articles_added: u64,
    pub categories: Vec<RunSummary>,
    pub error: Option<String>,
}

/// Structured result of a purge-and-refresh run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub success: bool,
    pub removed: u64,
    pub articles_added: u64,
    pub per_pipeline: Vec<PipelineBreakdown>,
    pub duplicates_cleaned: u64,
    pub freshness_updated: u64,
    pub duration_ms: u64,
    pub error: Option<String>,
}
