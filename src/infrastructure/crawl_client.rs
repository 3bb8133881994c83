//! Crawl client for the two remote endpoints
//!
//! Fetches listing pages and per-title series, classifies responses
//! (`Page`/`End`, success/throttled/transient) and owns the bounded
//! cool-down retry protocol for throttled series fetches.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::domain::constants::site;
use crate::domain::series::RawSeries;
use crate::domain::services::{CatalogPage, CrawlError, CrawlSource};
use crate::infrastructure::catalog_parser::parse_listing_fragment;
use crate::infrastructure::http_client::HttpClient;

/// Literal fragment the listing endpoint returns once pagination is
/// exhausted. An undocumented contract of the remote service.
const EMPTY_RESULTS_HTML: &str = "\r\n<!-- List Items -->\r\n<!-- End List Items -->\r\n";

/// Marker phrase the graph endpoint embeds in its error text when it
/// refuses crawling traffic.
const THROTTLE_NOTICE: &str = "Please do not crawl";

/// The single place deciding whether a remote error message means
/// "crawling blocked". If the remote service ever rewords its refusal,
/// this is the only line that changes.
fn is_throttle_notice(error: &str) -> bool {
    error.contains(THROTTLE_NOTICE)
}

/// JSON envelope of one listing page
#[derive(Debug, Deserialize)]
struct SearchResults {
    results_html: String,
    total_count: Option<u64>,
}

/// JSON envelope of one title's graph response
#[derive(Debug, Deserialize)]
struct GraphResponse {
    success: bool,
    #[serde(default)]
    data: Option<GraphData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphData {
    start: i64,
    step: i64,
    values: Vec<Option<i64>>,
}

/// Run `operation`, and after each throttle refusal cool down and retry,
/// at most `max_retries` additional attempts. The cool-down sleep aborts
/// promptly on cancellation.
pub(crate) async fn with_throttle_retry<T, F, Fut>(
    max_retries: u32,
    cooldown: Duration,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, CrawlError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CrawlError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Err(CrawlError::Throttled) if attempt < max_retries => {
                attempt += 1;
                warn!(
                    "🚧 Remote refused crawling; cooling down {}s before retry {}/{}",
                    cooldown.as_secs(),
                    attempt,
                    max_retries
                );
                tokio::select! {
                    _ = tokio::time::sleep(cooldown) => {}
                    _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
                }
            }
            other => return other,
        }
    }
}

/// HTTP-backed [`CrawlSource`] over the store search listing and the
/// per-title concurrent-player graph endpoint.
pub struct SteamCrawlClient {
    http: HttpClient,
    listing_base: Url,
    graph_base: Url,
    page_size: u32,
    throttle_cooldown: Duration,
    throttle_max_retries: u32,
}

impl SteamCrawlClient {
    pub fn new(
        http: HttpClient,
        page_size: u32,
        throttle_cooldown: Duration,
        throttle_max_retries: u32,
    ) -> Result<Self> {
        Ok(Self {
            http,
            listing_base: Url::parse(site::SEARCH_RESULTS_URL)
                .context("Invalid listing endpoint URL")?,
            graph_base: Url::parse(site::GRAPH_URL).context("Invalid graph endpoint URL")?,
            page_size,
            throttle_cooldown,
            throttle_max_retries,
        })
    }

    /// Listing page URL at `offset`, with the fixed VR-only filter flags.
    fn listing_url(&self, offset: u32) -> Url {
        let mut url = self.listing_base.clone();
        url.query_pairs_mut()
            .append_pair("query", "")
            .append_pair("start", &offset.to_string())
            .append_pair("count", &self.page_size.to_string())
            .append_pair("dynamic_data", "")
            .append_pair("sort_by", "Released_DESC")
            .append_pair("force_infinite", "1")
            .append_pair("category1", site::GAMES_CATEGORY_FLAG)
            .append_pair("vrsupport", site::VR_ONLY_SUPPORT_FLAG)
            .append_pair("infinite", "1");
        url
    }

    fn graph_url(&self, appid: i64) -> Url {
        let mut url = self.graph_base.clone();
        url.query_pairs_mut()
            .append_pair("type", "concurrent_max")
            .append_pair("appid", &appid.to_string());
        url
    }

    /// One attempt against the graph endpoint, classified.
    async fn try_fetch_series(
        &self,
        appid: i64,
        cancel: &CancellationToken,
    ) -> Result<RawSeries, CrawlError> {
        let url = self.graph_url(appid);
        let body = self.http.get_text(url.as_str(), cancel).await?;
        let response: GraphResponse = serde_json::from_str(&body)
            .map_err(|e| CrawlError::decode(format!("graph payload for {appid}: {e}")))?;

        if response.success {
            let data = response.data.ok_or_else(|| {
                CrawlError::decode(format!("graph payload for {appid}: success without data"))
            })?;
            Ok(RawSeries {
                appid,
                start: data.start,
                step: data.step,
                values: data.values,
            })
        } else {
            let message = response.error.unwrap_or_default();
            if is_throttle_notice(&message) {
                Err(CrawlError::Throttled)
            } else {
                Err(CrawlError::network(format!(
                    "graph endpoint refused appid {appid}: {message}"
                )))
            }
        }
    }
}

#[async_trait]
impl CrawlSource for SteamCrawlClient {
    async fn fetch_catalog_page(
        &self,
        offset: u32,
        cancel: &CancellationToken,
    ) -> Result<CatalogPage, CrawlError> {
        let url = self.listing_url(offset);
        let body = self.http.get_text(url.as_str(), cancel).await?;
        let results: SearchResults = serde_json::from_str(&body)
            .map_err(|e| CrawlError::decode(format!("listing page at offset {offset}: {e}")))?;

        if results.results_html == EMPTY_RESULTS_HTML {
            return Ok(CatalogPage::End);
        }

        let entries = parse_listing_fragment(&results.results_html)
            .map_err(|e| CrawlError::decode(e.to_string()))?;
        if entries.is_empty() {
            // A non-sentinel page with nothing extractable makes no further
            // progress either.
            debug!(offset, "Listing page carried no entries, treating as exhausted");
            return Ok(CatalogPage::End);
        }

        Ok(CatalogPage::Page {
            entries,
            total_count: results.total_count,
        })
    }

    async fn fetch_series(
        &self,
        appid: i64,
        cancel: &CancellationToken,
    ) -> Result<RawSeries, CrawlError> {
        with_throttle_retry(
            self.throttle_max_retries,
            self.throttle_cooldown,
            cancel,
            || self.try_fetch_series(appid, cancel),
        )
        .await
    }
}
