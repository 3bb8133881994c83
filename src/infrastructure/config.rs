//! Configuration infrastructure
//!
//! A single JSON file with full defaults; a missing file means defaults
//! and is written out once so the operator has something to edit. Every
//! field is optional in the file thanks to `#[serde(default)]`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::domain::constants::{crawling, site};
use crate::infrastructure::http_client::HttpClientConfig;

/// Default location of the configuration file, next to the binary's
/// working directory.
pub const DEFAULT_CONFIG_PATH: &str = "vr-player-stats.json";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub crawling: CrawlingConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            crawling: CrawlingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Store location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/vr_player_stats.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Crawling behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlingConfig {
    /// User agent presented to both remote endpoints
    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Requests per second across all concurrent fetches
    pub max_requests_per_second: u32,

    /// Concurrent per-title fetches sharing the rate limiter
    pub max_concurrent_fetches: usize,

    /// Safety cap on catalog listing pages per discovery pass
    pub max_catalog_pages: u32,

    /// Cool-down after a throttle refusal, in seconds
    pub throttle_cooldown_seconds: u64,

    /// Bounded retries after a throttle cool-down
    pub throttle_max_retries: u32,
}

impl Default for CrawlingConfig {
    fn default() -> Self {
        Self {
            user_agent: HttpClientConfig::default().user_agent,
            timeout_seconds: crawling::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: crawling::DEFAULT_MAX_REQUESTS_PER_SECOND,
            max_concurrent_fetches: crawling::DEFAULT_MAX_CONCURRENT_FETCHES,
            max_catalog_pages: crawling::DEFAULT_MAX_CATALOG_PAGES,
            throttle_cooldown_seconds: crawling::DEFAULT_THROTTLE_COOLDOWN_SECONDS,
            throttle_max_retries: crawling::DEFAULT_THROTTLE_MAX_RETRIES,
        }
    }
}

impl CrawlingConfig {
    /// Page geometry is a site characteristic, not an operator knob.
    pub fn page_size(&self) -> u32 {
        site::ENTRIES_PER_PAGE
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
    /// Also write a rolling daily log file
    pub file_output: bool,
    /// Directory for log files
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_output: false,
            log_dir: "logs".to_string(),
        }
    }
}

/// Loads the configuration file, falling back to (and persisting)
/// defaults when it does not exist yet.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub async fn load_or_default(&self) -> Result<AppConfig> {
        if self.config_path.exists() {
            let contents = fs::read_to_string(&self.config_path)
                .await
                .with_context(|| format!("reading {}", self.config_path.display()))?;
            let config: AppConfig = serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", self.config_path.display()))?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            self.save(&config).await?;
            info!(
                "Wrote default configuration to {}",
                self.config_path.display()
            );
            Ok(config)
        }
    }

    pub async fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let contents = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)
            .await
            .with_context(|| format!("writing {}", self.config_path.display()))?;
        Ok(())
    }
}
