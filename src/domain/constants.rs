//! Site characteristics and domain constants
//!
//! Fixed facts about the two remote endpoints and the synchronization policy.

/// Steam store search listing characteristics
pub mod site {
    /// Number of catalog entries requested per listing page
    pub const ENTRIES_PER_PAGE: u32 = 50;

    /// Base URL of the store search endpoint (infinite-scroll JSON)
    pub const SEARCH_RESULTS_URL: &str = "https://store.steampowered.com/search/results/";

    /// Base URL of the per-title concurrent-player graph endpoint
    pub const GRAPH_URL: &str = "https://steamdb.info/api/GetGraph/";

    /// Filter flag selecting titles with full VR support ("VR Only")
    pub const VR_ONLY_SUPPORT_FLAG: &str = "401";

    /// Category flag restricting the listing to games
    pub const GAMES_CATEGORY_FLAG: &str = "998";
}

/// Synchronization policy constants
pub mod sync {
    /// Days before the first of the current month that the newest stored
    /// sample may lag before a refresh is due. Yields a roughly-monthly
    /// cadence with a grace window absorbing crawl delays.
    pub const REFRESH_LAG_DAYS: i64 = 20;

    /// App ids whose player counts are non-representative outliers
    /// (benchmark utilities). Never admitted to the catalog.
    pub const BLOCKED_APP_IDS: &[i64] = &[450_110];

    /// A single corrupted historical crawl day. Rows carrying this date are
    /// excluded from every aggregate read even if present in storage.
    pub const CORRUPT_SAMPLE_DATE: &str = "2019-07-24";
}

/// Crawling defaults
pub mod crawling {
    /// Default requests per second against the remote endpoints (courtesy
    /// spacing of roughly 300 ms between requests)
    pub const DEFAULT_MAX_REQUESTS_PER_SECOND: u32 = 3;

    /// Default request timeout in seconds
    pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Default cool-down after the remote refuses crawling, in seconds
    pub const DEFAULT_THROTTLE_COOLDOWN_SECONDS: u64 = 400;

    /// Default bounded retry count after a throttle cool-down
    pub const DEFAULT_THROTTLE_MAX_RETRIES: u32 = 1;

    /// Default concurrent per-title fetches sharing one rate limiter
    pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 2;

    /// Default safety cap on catalog pages per discovery pass
    pub const DEFAULT_MAX_CATALOG_PAGES: u32 = 200;
}
