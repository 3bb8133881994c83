//! Crawl service seam and error taxonomy
//!
//! The orchestrator only ever talks to the remote endpoints through the
//! [`CrawlSource`] trait; infrastructure provides the HTTP-backed
//! implementation and tests provide scripted ones.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::catalog::CatalogEntry;
use crate::domain::series::RawSeries;

/// Classified failure of a single remote interaction.
///
/// No variant here is fatal to a sync cycle: a failed title contributes
/// zero samples and the cycle continues. Only persistence failures (plain
/// `anyhow` errors from the store) abort a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    /// The request itself failed (transport, HTTP status, timeout).
    /// Retried no earlier than the next scheduled cycle.
    #[error("network request failed: {message}")]
    Network { message: String },

    /// The remote explicitly refused due to its crawl-rate policy, and the
    /// bounded cool-down retry was exhausted.
    #[error("remote refused crawling and the bounded retry was exhausted")]
    Throttled,

    /// The response arrived but could not be understood.
    #[error("malformed remote payload: {message}")]
    Decode { message: String },

    /// The operator stopped the cycle; never reported as a title failure.
    #[error("operation cancelled")]
    Cancelled,
}

impl CrawlError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// One fetched catalog listing page, already classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogPage {
    /// A non-empty page of entries in listing order. `total_count` is the
    /// remote's overall result count when it reports one; used only for
    /// progress display, never for termination.
    Page {
        entries: Vec<CatalogEntry>,
        total_count: Option<u64>,
    },
    /// The pagination-exhausted sentinel. The sole termination signal for
    /// discovery.
    End,
}

/// Remote access used by a sync cycle.
#[async_trait]
pub trait CrawlSource: Send + Sync {
    /// Fetch the catalog listing page starting at `offset`.
    async fn fetch_catalog_page(
        &self,
        offset: u32,
        cancel: &CancellationToken,
    ) -> Result<CatalogPage, CrawlError>;

    /// Fetch one title's sparse player-count series. Implementations own
    /// the throttle cool-down protocol: on a throttle response they pause
    /// and retry the same request a bounded number of times before giving
    /// up with [`CrawlError::Throttled`].
    async fn fetch_series(
        &self,
        appid: i64,
        cancel: &CancellationToken,
    ) -> Result<RawSeries, CrawlError>;
}
