//! Timestamp formatting, acquisition windows and calendar iteration.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use crate::error::{GeoError, GeoResult};

const GOES_STAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Minute-resolution stamp used in file names, e.g. "202207011530".
pub fn goes_time_str(t: DateTime<Utc>) -> String {
    t.format(GOES_STAMP_FORMAT).to_string()
}

pub fn parse_goes_time_str(s: &str) -> GeoResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, GOES_STAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| GeoError::InvalidTimestamp(s.to_string()))
}

pub fn from_epoch_millis(ms: i64) -> GeoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| GeoError::InvalidTimestamp(ms.to_string()))
}

/// Half-open one-minute window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MinuteWindow {
    /// The calendar minute containing `t`.
    pub fn containing(t: DateTime<Utc>) -> Self {
        let start = t
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(t);
        Self {
            start,
            end: start + Duration::minutes(1),
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }
}

/// Inclusive iterator over calendar days with a fixed step.
#[derive(Debug, Clone)]
pub struct DayIterator {
    next: Option<NaiveDate>,
    end: NaiveDate,
    step: Duration,
}

impl DayIterator {
    pub fn new(start: NaiveDate, end: NaiveDate, step_days: u32) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
            step: Duration::days(step_days.max(1) as i64),
        }
    }
}

impl Iterator for DayIterator {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = current
            .checked_add_signed(self.step)
            .filter(|d| *d <= self.end);
        Some(current)
    }
}
