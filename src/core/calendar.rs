//! Business calendar.
//!
//! Entry dates and processing dates are civil dates at a fixed UTC+07:00 offset,
//! independent of the server's local timezone and without daylight saving.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

/// Offset of the business calendar from UTC, in hours.
pub const BUSINESS_UTC_OFFSET_HOURS: i64 = 7;

/// Civil date of `instant` in the business calendar.
#[must_use]
pub fn business_date(instant: DateTime<Utc>) -> NaiveDate {
    (instant + TimeDelta::hours(BUSINESS_UTC_OFFSET_HOURS)).date_naive()
}

/// Today's business date.
#[must_use]
pub fn today() -> NaiveDate {
    business_date(Utc::now())
}
