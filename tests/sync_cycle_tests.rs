//! End-to-end sync cycle tests against a real SQLite store
//!
//! The remote side is scripted; the store side is the production
//! SQLite-backed repository on a scratch database file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use vr_player_stats::application::{CycleOutcome, SyncConfig, SyncOrchestrator};
use vr_player_stats::domain::{
    CatalogEntry, CatalogPage, CrawlError, CrawlSource, RawSeries, TitleStore,
};
use vr_player_stats::infrastructure::{DatabaseConnection, SqliteTitleStore};

struct ScriptedSource {
    pages: Vec<CatalogPage>,
    series: HashMap<i64, Result<RawSeries, CrawlError>>,
    series_requests: AtomicUsize,
}

#[async_trait]
impl CrawlSource for ScriptedSource {
    async fn fetch_catalog_page(
        &self,
        offset: u32,
        _cancel: &CancellationToken,
    ) -> Result<CatalogPage, CrawlError> {
        let index = (offset / 50) as usize;
        Ok(self.pages.get(index).cloned().unwrap_or(CatalogPage::End))
    }

    async fn fetch_series(
        &self,
        appid: i64,
        _cancel: &CancellationToken,
    ) -> Result<RawSeries, CrawlError> {
        self.series_requests.fetch_add(1, Ordering::SeqCst);
        self.series
            .get(&appid)
            .cloned()
            .unwrap_or_else(|| Err(CrawlError::network("unscripted appid")))
    }
}

fn page(entries: Vec<(i64, &str)>) -> CatalogPage {
    CatalogPage::Page {
        entries: entries
            .into_iter()
            .map(|(appid, name)| CatalogEntry {
                appid,
                name: name.to_string(),
            })
            .collect(),
        total_count: None,
    }
}

fn daily_series(appid: i64, values: Vec<Option<i64>>) -> RawSeries {
    RawSeries {
        appid,
        start: 1_609_459_200, // 2021-01-01T00:00:00Z
        step: 86_400,
        values,
    }
}

async fn sqlite_store(dir: &TempDir) -> Arc<SqliteTitleStore> {
    let url = format!("sqlite:{}", dir.path().join("cycle.db").display());
    let db = DatabaseConnection::new(&url, 5).await.unwrap();
    db.migrate().await.unwrap();
    Arc::new(SqliteTitleStore::new(Arc::new(db.pool().clone())))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn orchestrator(
    store: Arc<SqliteTitleStore>,
    source: Arc<ScriptedSource>,
) -> SyncOrchestrator {
    SyncOrchestrator::new(store, source, SyncConfig::default())
}

#[tokio::test]
async fn empty_store_cycle_persists_only_the_allowed_title() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;

    // Two candidates, one of them denylisted (a benchmark utility).
    let source = Arc::new(ScriptedSource {
        pages: vec![page(vec![(10, "Alpha"), (450_110, "Benchmark")]), CatalogPage::End],
        series: HashMap::from([(10, Ok(daily_series(10, vec![Some(5), None, Some(0), Some(12)])))]),
        series_requests: AtomicUsize::new(0),
    });

    let report = orchestrator(store.clone(), source.clone())
        .run_cycle(date(2024, 7, 1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome, CycleOutcome::Updated);
    assert_eq!(report.new_titles, 1);
    assert_eq!(report.samples_written, 2);

    let titles = store.all_titles().await.unwrap();
    assert_eq!(titles.len(), 1);
    assert_eq!(titles[0].appid, 10);
    assert!(store.find_title(450_110).await.unwrap().is_none());

    // Only the denylist-surviving title was fetched.
    assert_eq!(source.series_requests.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.max_sample_date().await.unwrap(),
        Some(date(2021, 1, 4))
    );
}

#[tokio::test]
async fn unchanged_remote_makes_consecutive_cycles_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;

    let source = Arc::new(ScriptedSource {
        pages: vec![page(vec![(10, "Alpha"), (11, "Beta")]), CatalogPage::End],
        series: HashMap::from([
            (10, Ok(daily_series(10, vec![Some(5), Some(6)]))),
            (11, Ok(daily_series(11, vec![None, Some(3)]))),
        ]),
        series_requests: AtomicUsize::new(0),
    });

    let orchestrator = orchestrator(store.clone(), source);

    // The stored dates are from 2021, ancient relative to "today", so both
    // cycles run a full refresh against the unchanged scripted remote.
    orchestrator
        .run_cycle(date(2030, 7, 1), &CancellationToken::new())
        .await
        .unwrap();
    let first_max = store.max_sample_date().await.unwrap();

    let report = orchestrator
        .run_cycle(date(2030, 7, 1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome, CycleOutcome::Updated);
    assert_eq!(report.new_titles, 0);
    assert_eq!(report.samples_written, 3);
    assert_eq!(store.max_sample_date().await.unwrap(), first_max);
}

#[tokio::test]
async fn revised_remote_history_fully_replaces_stored_samples() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;

    let first = Arc::new(ScriptedSource {
        pages: vec![page(vec![(10, "Alpha")]), CatalogPage::End],
        series: HashMap::from([(10, Ok(daily_series(10, vec![Some(5), Some(6), Some(7)])))]),
        series_requests: AtomicUsize::new(0),
    });
    orchestrator(store.clone(), first)
        .run_cycle(date(2030, 7, 1), &CancellationToken::new())
        .await
        .unwrap();

    // The remote retroactively revised the series down to a single day.
    let second = Arc::new(ScriptedSource {
        pages: vec![page(vec![(10, "Alpha")]), CatalogPage::End],
        series: HashMap::from([(10, Ok(daily_series(10, vec![Some(9)])))]),
        series_requests: AtomicUsize::new(0),
    });
    let report = orchestrator(store.clone(), second)
        .run_cycle(date(2030, 7, 1), &CancellationToken::new())
        .await
        .unwrap();

    // No stale sample survived the replace.
    assert_eq!(report.samples_written, 1);
    assert_eq!(
        store.max_sample_date().await.unwrap(),
        Some(date(2021, 1, 1))
    );
}

#[tokio::test]
async fn failed_title_is_reported_and_the_rest_commits() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;

    let source = Arc::new(ScriptedSource {
        pages: vec![page(vec![(10, "Alpha"), (11, "Beta")]), CatalogPage::End],
        series: HashMap::from([
            (10, Ok(daily_series(10, vec![Some(4)]))),
            (11, Err(CrawlError::Throttled)),
        ]),
        series_requests: AtomicUsize::new(0),
    });

    let report = orchestrator(store.clone(), source)
        .run_cycle(date(2024, 7, 1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome, CycleOutcome::Updated);
    assert_eq!(report.failed_appids, vec![11]);
    assert_eq!(report.samples_written, 1);
    assert_eq!(
        store.max_sample_date().await.unwrap(),
        Some(date(2021, 1, 1))
    );
}
