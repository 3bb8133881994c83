//! Sparse fixed-step series decoding
//!
//! The remote graph endpoint encodes a title's history as a start timestamp,
//! a fixed step and an ordered list of slots, where a slot is either a
//! player count or absent. Decoding walks the slots once and produces dense
//! dated samples.

use chrono::{DateTime, NaiveDate};

use crate::domain::title::Sample;

/// A transient, never-persisted unit of decoding: one title's sparse series
/// exactly as the remote endpoint delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSeries {
    pub appid: i64,
    /// Unix epoch seconds of the first slot
    pub start: i64,
    /// Fixed spacing between slots in seconds
    pub step: i64,
    /// Ordered oldest-to-newest; `None` marks a slot with no observation
    pub values: Vec<Option<i64>>,
}

impl RawSeries {
    /// Lazily decode into dense samples.
    ///
    /// Every slot advances the running timestamp by `step`, present or not;
    /// skipping the advance would misalign every later slot. Only values
    /// strictly greater than zero are emitted. Emitted dates strictly
    /// increase: should two slots ever fall on the same UTC calendar day,
    /// the first observation of that day wins.
    ///
    /// The iterator borrows the series, so a fresh pass can be started at
    /// any time by calling `decode` again.
    pub fn decode(&self) -> SampleIter<'_> {
        SampleIter {
            appid: self.appid,
            step: self.step,
            timestamp: self.start,
            slots: self.values.iter(),
            last_date: None,
        }
    }
}

/// Single-pass iterator over the dense samples of a [`RawSeries`].
pub struct SampleIter<'a> {
    appid: i64,
    step: i64,
    timestamp: i64,
    slots: std::slice::Iter<'a, Option<i64>>,
    last_date: Option<NaiveDate>,
}

impl Iterator for SampleIter<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Self::Item> {
        for &slot in self.slots.by_ref() {
            let timestamp = self.timestamp;
            self.timestamp += self.step;

            let Some(players) = slot else { continue };
            if players <= 0 {
                continue;
            }
            let Some(date) = DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
            else {
                // Timestamp outside the representable range; the slot still
                // advanced the clock above.
                continue;
            };
            if self.last_date.is_some_and(|prev| date <= prev) {
                continue;
            }
            self.last_date = Some(date);
            return Some(Sample {
                appid: self.appid,
                date,
                players,
            });
        }
        None
    }
}
