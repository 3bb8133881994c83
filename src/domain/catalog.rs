//! Catalog discovery types and the new-entry filter

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::title::Title;

/// One `(appid, name)` pair discovered on a listing page, in page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub appid: i64,
    pub name: String,
}

impl From<CatalogEntry> for Title {
    fn from(entry: CatalogEntry) -> Self {
        Title {
            appid: entry.appid,
            name: entry.name,
        }
    }
}

/// Keep only candidates that are genuinely new.
///
/// A candidate survives when its id is in neither `known_ids` nor
/// `blocked_ids`; candidate order is preserved. Denylisted ids are never
/// re-admitted, no matter how often the remote catalog lists them.
pub fn filter_new_entries(
    candidates: Vec<CatalogEntry>,
    known_ids: &HashSet<i64>,
    blocked_ids: &HashSet<i64>,
) -> Vec<CatalogEntry> {
    candidates
        .into_iter()
        .filter(|entry| !known_ids.contains(&entry.appid) && !blocked_ids.contains(&entry.appid))
        .collect()
}
