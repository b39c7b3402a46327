use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

use crate::error::AppError;
use crate::history::format::EnrichedRecord;

/// Extra days fetched ahead of the largest window, covering non-trading days
/// and interval rounding.
pub const PADDING_DAYS: u64 = 10;

/// Inclusive calendar date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::ValidationError(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` most recent complete days before `today`: the range ends
    /// yesterday so a partially formed current day is never included.
    pub fn last_complete_days(today: NaiveDate, days: u32) -> Result<Self, AppError> {
        let days = u64::from(days.max(1));
        let end = today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| AppError::ValidationError(format!("No complete day before {}", today)))?;
        let start = end
            .checked_sub_days(Days::new(days - 1))
            .ok_or_else(|| AppError::ValidationError(format!("Lookback of {} days is out of range", days)))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// First date to fetch so the largest window is already populated on
/// `range.start`. Saturates at the earliest representable date.
pub fn extend(range: &DateRange, max_window: Option<usize>) -> NaiveDate {
    match max_window {
        None => range.start,
        Some(window) => {
            let days = (window as u64).saturating_add(PADDING_DAYS);
            range.start.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
        }
    }
}

/// Instants covering `[start 00:00:00, end 23:59:59]` in UTC.
pub fn fetch_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    (
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(end_of_day).and_utc(),
    )
}

/// Drops the warm-up records fetched ahead of `original_start`.
///
/// Compares UTC calendar dates, the same date the `datetime` field shows.
/// Identity when the range was not extended.
pub fn filter(records: Vec<EnrichedRecord>, original_start: NaiveDate, extended: bool) -> Vec<EnrichedRecord> {
    if !extended {
        return records;
    }
    records
        .into_iter()
        .filter(|record| record.date() >= original_start)
        .collect()
}
