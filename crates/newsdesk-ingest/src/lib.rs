//! News ingestion core for newsdesk.
//!
//! Fetches raw items from REST, RSS and scrape sources, normalizes them into
//! [`newsdesk_core::CanonicalArticle`]s, drops duplicates, scores the
//! survivors and upserts them idempotently. [`Coordinator`] wraps that in a
//! purge-and-refill maintenance run; [`IngestService`] is the entry point the
//! CLI and the HTTP server share.

pub mod cancel;
pub mod coordinator;
pub mod dedup;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod orchestrator;
pub mod scorer;
pub mod service;
pub mod sources;
pub mod store;
pub mod types;

pub use cancel::{CancelHandle, CancelSignal};
pub use coordinator::{Coordinator, Pipeline};
pub use dedup::{Deduplicator, RunScope, Verdict};
pub use error::{IngestError, SourceError, StoreError};
pub use memory::MemoryStore;
pub use normalize::{normalize, Rejection};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use scorer::{lexicon_score, HeuristicScorer, QualityScorer};
pub use service::{IngestService, DEFAULT_INGEST_LIMIT, MAX_INGEST_LIMIT, MAX_LOG_LIMIT};
pub use sources::{AdapterOutcome, SourceAdapter, SourceDescriptor};
pub use store::{ArticleStore, PgStore, RunLogger, UpsertOutcome};
pub use types::{IngestResponse, RawItem};
