//! vr-player-stats entry point
//!
//! Runs exactly one synchronization cycle: discover new VR titles, decide
//! whether a player-count refresh is due, fetch and atomically replace the
//! sample table, then print a one-line summary. No flags; Ctrl-C requests
//! a cooperative stop that is honored within one fetch's latency.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use vr_player_stats::application::{SyncConfig, SyncOrchestrator};
use vr_player_stats::infrastructure::{
    init_logging, ConfigManager, DatabaseConnection, HttpClient, HttpClientConfig,
    SqliteTitleStore, SteamCrawlClient, DEFAULT_CONFIG_PATH,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigManager::new(DEFAULT_CONFIG_PATH)
        .load_or_default()
        .await
        .context("loading configuration")?;
    init_logging(&config.logging)?;

    let db = DatabaseConnection::new(&config.database.url, config.database.max_connections)
        .await
        .context("opening database")?;
    db.migrate().await.context("preparing database schema")?;
    let store = Arc::new(SqliteTitleStore::new(Arc::new(db.pool().clone())));

    let http = HttpClient::new(HttpClientConfig {
        user_agent: config.crawling.user_agent.clone(),
        timeout_seconds: config.crawling.timeout_seconds,
        max_requests_per_second: config.crawling.max_requests_per_second,
    })
    .context("building HTTP client")?;
    let source = Arc::new(
        SteamCrawlClient::new(
            http,
            config.crawling.page_size(),
            Duration::from_secs(config.crawling.throttle_cooldown_seconds),
            config.crawling.throttle_max_retries,
        )
        .context("building crawl client")?,
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Stop requested; finishing the current fetch before shutting down");
                cancel.cancel();
            }
        });
    }

    let orchestrator = SyncOrchestrator::new(
        store,
        source,
        SyncConfig {
            page_size: config.crawling.page_size(),
            max_catalog_pages: config.crawling.max_catalog_pages,
            max_concurrent_fetches: config.crawling.max_concurrent_fetches,
        },
    );

    println!("Checking for new VR titles and refreshing player counts.");
    println!("The data is collected via web crawling and can take a while.");

    let report = orchestrator
        .run_cycle(Utc::now().date_naive(), &cancel)
        .await?;
    println!("{report}");

    Ok(())
}
