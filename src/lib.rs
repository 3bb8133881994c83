//! vr-player-stats - Steam VR title catalog and player-count synchronization
//!
//! This library maintains a local SQLite time-series store of daily
//! concurrent-player counts for the catalog of Steam VR-only titles,
//! crawled politely from the store search listing and the per-title
//! player-count graph endpoint.

// Module declarations
pub mod domain;
pub mod application;
pub mod infrastructure;
