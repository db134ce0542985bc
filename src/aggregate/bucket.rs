//! Calendar bucketing of timestamp group keys.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value;

use crate::model::DateGrouping;

/// Time zone the viewer sees dates in.
///
/// Buckets are cut in the viewer's local calendar, never UTC-normalized, so
/// a case opened late in the evening lands on the viewer's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerZone {
    /// The zone of the machine running the session.
    #[default]
    Local,
    /// An explicit UTC offset, e.g. from the viewer's profile.
    Fixed(FixedOffset),
}

impl ViewerZone {
    /// Build a fixed zone from minutes east of UTC; out-of-range offsets
    /// fall back to the local zone.
    pub fn from_offset_minutes(minutes: i32) -> Self {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(ViewerZone::Fixed)
            .unwrap_or(ViewerZone::Local)
    }

    /// The viewer's calendar date for a stored group value.
    pub fn local_date(&self, value: &Value) -> Option<NaiveDate> {
        match self {
            ViewerZone::Local => local_date_in(value, &Local),
            ViewerZone::Fixed(offset) => local_date_in(value, offset),
        }
    }
}

/// Interpret a stored value as a calendar date in `tz`.
///
/// Values with an explicit offset (RFC 3339) are converted into `tz`.
/// Offset-less timestamps and plain dates are taken to be already local.
pub fn local_date_in<Tz: TimeZone>(value: &Value, tz: &Tz) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(tz).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.date());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Truncate a date to the start of its bucket.
pub fn truncate(date: NaiveDate, grouping: DateGrouping) -> NaiveDate {
    match grouping {
        DateGrouping::Day => date,
        DateGrouping::Week => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        DateGrouping::Month => date.with_day(1).unwrap_or(date),
        DateGrouping::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
    }
}
