//! Rate-limited HTTP transport.
//!
//! Wraps a `reqwest::Client` with a governor quota so every provider
//! request waits for a permit before going out.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::traits::transport::Transport;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

const USER_AGENT: &str = concat!("harvester/", env!("CARGO_PKG_VERSION"));

/// HTTP transport that enforces a per-provider request quota.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    limiter: Arc<DefaultRateLimiter>,
}

impl HttpTransport {
    /// Create a transport allowing `requests_per_second` sustained requests.
    pub fn new(requests_per_second: u32) -> FetchResult<Self> {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(Quota::per_second(rps))
    }

    /// Create with one request per `period` (for providers asking for slow polling).
    pub fn every(period: Duration) -> FetchResult<Self> {
        let quota = Quota::with_period(period).ok_or_else(|| FetchError::Http(
            format!("invalid rate limit period: {period:?}").into(),
        ))?;
        Self::with_quota(quota)
    }

    /// Create with a custom quota.
    pub fn with_quota(quota: Quota) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> FetchResult<String> {
        self.limiter.until_ready().await;

        debug!(url = %url, "HTTP fetch starting");
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http(Box::new(e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_is_clamped() {
        assert!(HttpTransport::new(0).is_ok());
    }

    #[test]
    fn test_zero_period_is_rejected() {
        assert!(HttpTransport::every(Duration::ZERO).is_err());
        assert!(HttpTransport::every(Duration::from_secs(3)).is_ok());
    }
}
