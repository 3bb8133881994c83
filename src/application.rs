//! Application layer: the synchronization use case

pub mod sync;

pub use sync::{CycleOutcome, SyncConfig, SyncOrchestrator, SyncReport};
