//! RawSourceClient - Upstream counter adapter
//!
//! ## Responsibilities
//!
//! - Fetch one integer reading per request (`Accept: text/plain`)
//! - Translate transport failures and non-integer bodies into typed errors
//!
//! No retries here: the polling orchestrator retries on its next tick.

use crate::error::{Error, Result};
use reqwest::header::ACCEPT;
use std::future::Future;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 3000;

/// Anything the poller can sample a raw count from
pub trait RawSource: Send + Sync + 'static {
    /// Fetch one raw reading
    fn fetch(&self) -> impl Future<Output = Result<i64>> + Send;
}

/// HTTP client for the raw count endpoint
pub struct RawSourceClient {
    client: reqwest::Client,
    url: String,
}

impl RawSourceClient {
    /// Create new client with an explicit request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Fetch a raw count from `url`
    pub async fn fetch_from(&self, url: &str) -> Result<i64> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "text/plain")
            .send()
            .await
            .map_err(|e| Error::Transport {
                status: e.status().map(|s| s.as_u16()),
                body: None,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.ok().filter(|b| !b.is_empty());
            return Err(Error::Transport {
                status: Some(status.as_u16()),
                body,
                message: format!("Raw source returned {}", status),
            });
        }

        let body = resp.text().await.map_err(|e| Error::Transport {
            status: Some(status.as_u16()),
            body: None,
            message: format!("Failed to read response body: {}", e),
        })?;

        parse_count(&body)
    }
}

impl RawSource for RawSourceClient {
    async fn fetch(&self) -> Result<i64> {
        self.fetch_from(&self.url).await
    }
}

/// Parse a raw response body into a count
pub fn parse_count(body: &str) -> Result<i64> {
    let trimmed = body.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| Error::Parse(format!("Raw source body is not an integer: {:?}", trimmed)))
}
