//! Repository interface for the persistent title/sample store
//!
//! The core never issues queries beyond these five operations; every
//! aggregation or reporting query belongs to downstream consumers.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::title::{Sample, Title};

#[async_trait]
pub trait TitleStore: Send + Sync {
    /// All titles on record, in stable id order.
    async fn all_titles(&self) -> Result<Vec<Title>>;

    /// Look up a single title by app id.
    async fn find_title(&self, appid: i64) -> Result<Option<Title>>;

    /// Append new titles. Ids already on record are ignored, preserving the
    /// one-row-per-appid invariant.
    async fn append_titles(&self, titles: &[Title]) -> Result<()>;

    /// Atomically replace the entire sample set: delete everything, insert
    /// `samples`, commit. A failure mid-way must leave the previous set
    /// intact.
    async fn replace_all_samples(&self, samples: &[Sample]) -> Result<()>;

    /// Newest sample date on record, excluding the known corrupted date.
    /// `None` on an empty store.
    async fn max_sample_date(&self) -> Result<Option<NaiveDate>>;
}
