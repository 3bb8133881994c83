//! Catalog and time-series entities

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A persisted catalog entry: one VR title known to the store.
///
/// Created once per distinct app id, never mutated. The id is
/// source-assigned and stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub appid: i64,
    pub name: String,
}

impl Title {
    pub fn new(appid: i64, name: impl Into<String>) -> Self {
        Self {
            appid,
            name: name.into(),
        }
    }
}

/// One dated concurrent-player observation for a title.
///
/// At most one sample exists per `(appid, date)` pair; `players` is the
/// daily peak and is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub appid: i64,
    pub date: NaiveDate,
    pub players: i64,
}
