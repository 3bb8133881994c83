//! Listing-fragment parsing
//!
//! The store search endpoint returns its catalog entries as an HTML
//! fragment inside a JSON envelope. Each entry is an anchor carrying the
//! app id with the display name in a nested title span.

use anyhow::{anyhow, Result};
use scraper::{Html, Selector};
use tracing::debug;

use crate::domain::catalog::CatalogEntry;

/// Extract ordered `(appid, name)` pairs from a listing fragment.
///
/// Anchors and title spans appear pairwise per entry and are zipped in
/// document order. Entries whose id attribute does not parse as a single
/// integer (bundle rows carry comma-joined ids) are skipped.
pub fn parse_listing_fragment(fragment: &str) -> Result<Vec<CatalogEntry>> {
    let document = Html::parse_fragment(fragment);
    let link_selector = Selector::parse("a[data-ds-appid]")
        .map_err(|e| anyhow!("Invalid entry link selector: {e}"))?;
    let title_selector =
        Selector::parse("span.title").map_err(|e| anyhow!("Invalid title selector: {e}"))?;

    let ids = document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("data-ds-appid"));
    let names = document
        .select(&title_selector)
        .map(|element| element.text().collect::<String>().trim().to_string());

    let mut entries = Vec::new();
    for (raw_id, name) in ids.zip(names) {
        match raw_id.parse::<i64>() {
            Ok(appid) => entries.push(CatalogEntry { appid, name }),
            Err(_) => debug!(raw_id, "Skipping listing entry with composite app id"),
        }
    }
    Ok(entries)
}
