//! Typed errors for the harvester library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use std::time::Duration;
use thiserror::Error;

use crate::types::record::Source;

/// Errors that can occur during harvest, classification and storage.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// A provider fetch failed in a way that could not be handled locally
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The zero-shot capability could not be initialized.
    ///
    /// Callers treat this as the signal to use the lexical fallback.
    #[error("classifier unavailable: {reason}")]
    ClassifierUnavailable { reason: String },

    /// The zero-shot capability failed on a request
    #[error("classifier error: {0}")]
    Classifier(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The classifier returned something that violates its contract
    #[error("invalid classifier output: {reason}")]
    InvalidClassifierOutput { reason: String },

    /// An adapter did not finish within the collector's deadline
    #[error("{provider} timed out after {deadline:?}")]
    Timeout { provider: Source, deadline: Duration },

    /// An adapter task panicked or was aborted
    #[error("{provider} worker failed: {reason}")]
    Worker { provider: Source, reason: String },

    /// Invalid harvest query
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised while talking to a provider API.
///
/// These never cross the collector boundary: adapters log them and stop
/// paginating.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status code
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Request timed out
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Payload could not be decoded
    #[error("malformed {format} payload: {reason}")]
    Malformed { format: &'static str, reason: String },
}

impl FetchError {
    /// Build a `Malformed` error for a JSON payload.
    pub fn malformed_json(err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            format: "json",
            reason: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for HarvestError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Result type alias for harvester operations.
pub type HarvestResult<T> = std::result::Result<T, HarvestError>;

/// Result type alias for provider fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
