use crate::error::CoreError;
use crate::models::TimeWindow;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<(), CoreError> {
    parse_timezone(timezone).map(|_| ())
}

/// The calendar date it currently is in `tz`.
pub fn today_in(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

/// Resolve a wall-clock time on `date` in `tz` to a UTC instant.
///
/// Ambiguous times (fall back) resolve to the earliest instant. Times that do
/// not exist (spring forward) are pushed one hour later.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    if let Some(local) = tz.from_local_datetime(&naive).earliest() {
        return local.with_timezone(&Utc);
    }

    let shifted = naive + Duration::hours(1);
    match tz.from_local_datetime(&shifted).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // No zone has a gap longer than an hour; fall back to reading the time as UTC
        None => naive.and_utc(),
    }
}

/// Absolute start and end of an occurrence on `date`.
pub fn occurrence_bounds(
    date: NaiveDate,
    window: &TimeWindow,
    tz: &Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_to_utc(date, window.from, tz);
    let end_date = if window.crosses_midnight() {
        date.succ_opt().unwrap_or(date)
    } else {
        date
    };
    let end = local_to_utc(end_date, window.to, tz);
    (start, end.max(start))
}

/// Format datetime with timezone-aware display
pub fn format_with_timezone(datetime: DateTime<Utc>, tz: &Tz, format: &str) -> String {
    datetime.with_timezone(tz).format(format).to_string()
}
