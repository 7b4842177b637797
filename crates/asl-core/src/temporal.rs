//! # Temporal Helpers
//!
//! Calendar arithmetic shared by the expiry, retrospective assessment, and
//! sweep rules. All values are UTC; conversion to local time is a
//! presentation concern.
//!
//! Month arithmetic clamps to the last day of the target month
//! (31 January + 1 month = 28/29 February), matching `chrono::Months`.

use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::ValidationError;

/// Add whole months to a timestamp.
///
/// Saturates at `DateTime::<Utc>::MAX_UTC` instead of overflowing.
pub fn add_months(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    at.checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Subtract whole days from a timestamp, saturating at `MIN_UTC`.
pub fn sub_days(at: DateTime<Utc>, days: u64) -> DateTime<Utc> {
    at.checked_sub_days(Days::new(days))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Midnight at the start of the given timestamp's UTC day.
pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::MIN))
}

/// The last millisecond of the given timestamp's UTC day.
pub fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&at.date_naive().and_time(last))
}

/// Parse a timestamp from either RFC 3339 or a bare `YYYY-MM-DD` date.
///
/// Bare dates are read as UTC midnight.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    parse_date(value).map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
}

/// Parse a calendar date, accepting an RFC 3339 timestamp and keeping only its date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(d);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}
