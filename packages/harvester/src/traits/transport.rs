//! Transport trait - how adapters talk to provider APIs.
//!
//! Separating the wire from the paginators lets tests drive every adapter
//! with canned payloads (see [`crate::testing::MockTransport`]).

use async_trait::async_trait;
use url::Url;

use crate::error::FetchResult;

/// Fetches a provider URL and returns the response body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET the URL; non-success statuses are errors.
    async fn get(&self, url: &Url) -> FetchResult<String>;

    /// Transport name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
