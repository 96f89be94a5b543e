use newsdesk_core::ConfigError;
use newsdesk_db::DbError;
use thiserror::Error;

/// Failure of a single adapter call. Travels alongside the item list in
/// [`crate::sources::AdapterOutcome`] instead of aborting the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name}: credential {var} is not configured")]
    MissingCredential { source_name: String, var: &'static str },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
