//! The sync cycle orchestrator
//!
//! Drives one end-to-end cycle: discover catalog pages, append the delta,
//! decide whether a refresh is due, fetch every title's series, and
//! atomically replace the sample table. States:
//! `Idle → Discovering → Deciding → Fetching → Committing → Idle`,
//! returning to `Idle` on success, skip and abort alike.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::catalog::{CatalogEntry, filter_new_entries};
use crate::domain::constants::{crawling, site, sync};
use crate::domain::repositories::TitleStore;
use crate::domain::scheduler::refresh_due;
use crate::domain::services::{CatalogPage, CrawlError, CrawlSource};
use crate::domain::title::{Sample, Title};

/// Orchestrator tuning, page geometry and fetch parallelism.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Entries requested per listing page; also the offset stride.
    pub page_size: u32,
    /// Safety cap on listing pages per discovery pass.
    pub max_catalog_pages: u32,
    /// Concurrent per-title fetches. The shared rate limiter inside the
    /// crawl source governs the aggregate request rate, so raising this
    /// never makes the crawler less polite.
    pub max_concurrent_fetches: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: site::ENTRIES_PER_PAGE,
            max_catalog_pages: crawling::DEFAULT_MAX_CATALOG_PAGES,
            max_concurrent_fetches: crawling::DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// Cycle states. Transitions are logged; the orchestrator is back in
/// `Idle` whenever `run_cycle` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncPhase {
    Idle,
    Discovering,
    Deciding,
    Fetching,
    Committing,
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The sample table was replaced with a fresh fetch.
    Updated,
    /// The store was recent enough; only the catalog delta was appended.
    UpToDate,
    /// The operator stopped the cycle; nothing was committed.
    Cancelled,
}

/// Result of one cycle, rendered as the operator-facing summary line.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub outcome: CycleOutcome,
    /// Titles newly appended to the catalog this cycle.
    pub new_titles: usize,
    /// Titles on record when fetching started (0 unless a refresh ran).
    pub titles_total: usize,
    /// Samples written by the atomic replace (0 unless a refresh ran).
    pub samples_written: usize,
    /// Titles whose fetch still failed after the bounded retry; they
    /// contributed zero samples this cycle.
    pub failed_appids: Vec<i64>,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            CycleOutcome::Updated => {
                write!(
                    f,
                    "Database updated: {} titles ({} new), {} samples stored.",
                    self.titles_total, self.new_titles, self.samples_written
                )?;
                if !self.failed_appids.is_empty() {
                    write!(
                        f,
                        " {} title(s) skipped after failed fetches: {:?}.",
                        self.failed_appids.len(),
                        self.failed_appids
                    )?;
                }
                Ok(())
            }
            CycleOutcome::UpToDate => write!(
                f,
                "Database is up to date, no refresh required ({} new title(s) appended).",
                self.new_titles
            ),
            CycleOutcome::Cancelled => {
                write!(f, "Sync cancelled by operator; store left unchanged.")
            }
        }
    }
}

/// Drives one synchronization cycle end to end.
pub struct SyncOrchestrator {
    store: Arc<dyn TitleStore>,
    source: Arc<dyn CrawlSource>,
    config: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(store: Arc<dyn TitleStore>, source: Arc<dyn CrawlSource>, config: SyncConfig) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    /// Run one full cycle. Per-title fetch failures are contained and
    /// reported; only store failures propagate.
    pub async fn run_cycle(
        &self,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let mut phase = SyncPhase::Idle;

        self.enter(&mut phase, SyncPhase::Discovering);
        let Some(candidates) = self.discover(cancel).await? else {
            self.enter(&mut phase, SyncPhase::Idle);
            return Ok(Self::cancelled_report());
        };

        let known: HashSet<i64> = self
            .store
            .all_titles()
            .await
            .context("loading known titles")?
            .iter()
            .map(|t| t.appid)
            .collect();
        let blocked: HashSet<i64> = sync::BLOCKED_APP_IDS.iter().copied().collect();
        let delta: Vec<Title> = filter_new_entries(candidates, &known, &blocked)
            .into_iter()
            .map(Title::from)
            .collect();

        // Catalog growth is independent of whether a sample refresh runs;
        // the delta lands before the decision and outside the atomic replace.
        if !delta.is_empty() {
            info!("📋 Discovered {} new title(s)", delta.len());
            self.store
                .append_titles(&delta)
                .await
                .context("appending new titles")?;
        }
        let new_titles = delta.len();

        self.enter(&mut phase, SyncPhase::Deciding);
        let last_recorded = self
            .store
            .max_sample_date()
            .await
            .context("reading newest sample date")?;
        if !refresh_due(last_recorded, today) {
            info!(?last_recorded, "Store is recent enough, skipping refresh");
            self.enter(&mut phase, SyncPhase::Idle);
            return Ok(SyncReport {
                outcome: CycleOutcome::UpToDate,
                new_titles,
                titles_total: 0,
                samples_written: 0,
                failed_appids: Vec::new(),
            });
        }

        self.enter(&mut phase, SyncPhase::Fetching);
        let titles = self
            .store
            .all_titles()
            .await
            .context("loading titles for refresh")?;
        let (samples, failed_appids, fetch_cancelled) = self.fetch_all(&titles, cancel).await;

        if fetch_cancelled || cancel.is_cancelled() {
            self.enter(&mut phase, SyncPhase::Idle);
            return Ok(Self::cancelled_report());
        }

        self.enter(&mut phase, SyncPhase::Committing);
        let samples_written = samples.len();
        self.store
            .replace_all_samples(&samples)
            .await
            .context("replacing sample table")?;

        self.enter(&mut phase, SyncPhase::Idle);
        Ok(SyncReport {
            outcome: CycleOutcome::Updated,
            new_titles,
            titles_total: titles.len(),
            samples_written,
            failed_appids,
        })
    }

    /// Paginate the listing in ascending offset order until the exhausted
    /// sentinel, accumulating candidates deduplicated by app id.
    ///
    /// Returns `None` when the operator cancelled mid-discovery. A page
    /// fetch error ends discovery with what was accumulated so far; the
    /// next scheduled cycle picks up the remainder.
    async fn discover(&self, cancel: &CancellationToken) -> Result<Option<Vec<CatalogEntry>>> {
        let mut candidates: Vec<CatalogEntry> = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();
        let mut total_count: Option<u64> = None;

        for page_index in 0..self.config.max_catalog_pages {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let offset = page_index * self.config.page_size;
            match self.source.fetch_catalog_page(offset, cancel).await {
                Ok(CatalogPage::Page {
                    entries,
                    total_count: reported,
                }) => {
                    if total_count.is_none() {
                        total_count = reported;
                    }
                    for entry in entries {
                        if seen.insert(entry.appid) {
                            candidates.push(entry);
                        }
                    }
                    debug!(
                        offset,
                        accumulated = candidates.len(),
                        total = ?total_count,
                        "Catalog page processed"
                    );
                }
                Ok(CatalogPage::End) => {
                    info!(
                        "🔍 Catalog discovery finished: {} candidate(s) over {} page(s)",
                        candidates.len(),
                        page_index
                    );
                    return Ok(Some(candidates));
                }
                Err(CrawlError::Cancelled) => return Ok(None),
                Err(err) => {
                    warn!(offset, %err, "Catalog page fetch failed, ending discovery early");
                    return Ok(Some(candidates));
                }
            }
        }

        warn!(
            "Catalog page cap ({}) reached before the end sentinel",
            self.config.max_catalog_pages
        );
        Ok(Some(candidates))
    }

    /// Fetch every title's series with bounded parallelism over the shared
    /// rate limiter. Failed titles are collected, never fatal. Returns the
    /// decoded samples sorted for a deterministic replace.
    async fn fetch_all(
        &self,
        titles: &[Title],
        cancel: &CancellationToken,
    ) -> (Vec<Sample>, Vec<i64>, bool) {
        let total = titles.len();
        let mut samples: Vec<Sample> = Vec::new();
        let mut failed: Vec<i64> = Vec::new();
        let mut cancelled = false;
        let mut completed = 0usize;

        let mut fetches = stream::iter(titles.iter().cloned().map(|title| {
            let source = Arc::clone(&self.source);
            let cancel = cancel.clone();
            async move {
                // Cooperative stop: honored within one fetch's latency.
                if cancel.is_cancelled() {
                    return (title, Err(CrawlError::Cancelled));
                }
                let result = source.fetch_series(title.appid, &cancel).await;
                (title, result)
            }
        }))
        .buffer_unordered(self.config.max_concurrent_fetches.max(1));

        while let Some((title, result)) = fetches.next().await {
            completed += 1;
            match result {
                Ok(series) => {
                    let before = samples.len();
                    samples.extend(series.decode());
                    info!(
                        "📈 ({}/{}) {} [{}]: {} sample(s)",
                        completed,
                        total,
                        title.name,
                        title.appid,
                        samples.len() - before
                    );
                }
                Err(CrawlError::Cancelled) => {
                    cancelled = true;
                }
                Err(err) => {
                    warn!(
                        "({}/{}) {} [{}] fetch failed: {}",
                        completed, total, title.name, title.appid, err
                    );
                    failed.push(title.appid);
                }
            }
        }

        failed.sort_unstable();
        samples.sort_unstable_by_key(|s| (s.appid, s.date));
        (samples, failed, cancelled)
    }

    fn enter(&self, phase: &mut SyncPhase, next: SyncPhase) {
        debug!("sync phase: {:?} → {:?}", phase, next);
        *phase = next;
    }

    fn cancelled_report() -> SyncReport {
        SyncReport {
            outcome: CycleOutcome::Cancelled,
            new_titles: 0,
            titles_total: 0,
            samples_written: 0,
            failed_appids: Vec::new(),
        }
    }
}
