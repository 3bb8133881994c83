//! HTTP client for web crawling with rate limiting and cancellation
//!
//! Every outbound request first waits on a shared token bucket, keeping
//! the aggregate request rate polite no matter how many fetches run
//! concurrently.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::constants::crawling;
use crate::domain::services::CrawlError;

/// HTTP client configuration for crawling
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            // Browser-like headers; the graph endpoint rejects obvious bots.
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            timeout_seconds: crawling::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: crawling::DEFAULT_MAX_REQUESTS_PER_SECOND,
        }
    }
}

/// Rate-limited HTTP client shared by all fetches of a cycle.
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.8"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// Fetch a URL and return the body as text, honoring the rate limiter
    /// and the cancellation token at every suspension point.
    pub async fn get_text(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CrawlError> {
        if cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }

        tokio::select! {
            _ = self.rate_limiter.until_ready() => {}
            _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
        }

        debug!("Fetching URL: {}", url);

        let response = tokio::select! {
            result = self.client.get(url).send() => {
                result.map_err(|e| CrawlError::network(format!("GET {url}: {e}")))?
            }
            _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
        };

        if !response.status().is_success() {
            return Err(CrawlError::network(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        let text = tokio::select! {
            result = response.text() => {
                result.map_err(|e| CrawlError::network(format!("reading body of {url}: {e}")))?
            }
            _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
        };

        debug!("Fetched {} ({} chars)", url, text.len());
        Ok(text)
    }

    /// Get the configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        let config = HttpClientConfig::default();
        let client = HttpClient::new(config);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let client = HttpClient::new(HttpClientConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.get_text("https://example.invalid/", &cancel).await;
        assert_eq!(result, Err(CrawlError::Cancelled));
    }

    #[tokio::test]
    async fn zero_rate_limit_is_rejected() {
        let config = HttpClientConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(HttpClient::new(config).is_err());
    }
}
