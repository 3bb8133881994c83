//! Refresh scheduling policy
//!
//! Decides from the store's newest sample date whether a full sample
//! refresh is due at all.

use chrono::{Datelike, Duration, NaiveDate};

use crate::domain::constants::sync::REFRESH_LAG_DAYS;

/// Whether a refresh cycle should run.
///
/// An empty store is always due. Otherwise the cutoff is the first day of
/// `today`'s month minus a fixed lag window; a refresh is due iff the
/// newest recorded date is strictly earlier than that cutoff. The lag
/// yields an approximately-monthly cadence with a several-day grace window
/// absorbing crawl delays, rather than a strict calendar-month check.
pub fn refresh_due(last_recorded: Option<NaiveDate>, today: NaiveDate) -> bool {
    let Some(last_recorded) = last_recorded else {
        return true;
    };
    last_recorded < refresh_cutoff(today)
}

/// First day of `today`'s month minus the lag window.
fn refresh_cutoff(today: NaiveDate) -> NaiveDate {
    let first_of_month = today.with_day(1).unwrap_or(today);
    first_of_month - Duration::days(REFRESH_LAG_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_store_is_always_due() {
        assert!(refresh_due(None, date(2024, 7, 1)));
        assert!(refresh_due(None, date(1999, 12, 31)));
    }

    #[test]
    fn cutoff_is_first_of_month_minus_lag() {
        // First of July minus 20 days is June 11.
        assert_eq!(refresh_cutoff(date(2024, 7, 15)), date(2024, 6, 11));
        // Lag crossing a year boundary.
        assert_eq!(refresh_cutoff(date(2024, 1, 3)), date(2023, 12, 12));
    }

    #[test]
    fn one_day_before_cutoff_is_due() {
        let today = date(2024, 7, 1);
        let cutoff = refresh_cutoff(today);
        assert!(refresh_due(Some(cutoff - Duration::days(1)), today));
    }

    #[test]
    fn on_or_after_cutoff_is_not_due() {
        let today = date(2024, 7, 1);
        let cutoff = refresh_cutoff(today);
        assert!(!refresh_due(Some(cutoff), today));
        assert!(!refresh_due(Some(cutoff + Duration::days(1)), today));
    }
}
