use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, NaiveDate, NaiveTime, Offset, Utc};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;
use daybook_core::models::{Recurrence, WeekdaySet};
use std::collections::BTreeSet;

use crate::cli::Frequency;

/// Parses a calendar day. ISO dates are taken as is; anything else goes
/// through natural language parsing relative to now in `tz`.
pub fn parse_date(input: &str, tz: &Tz) -> Result<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }

    let local = Utc::now().with_timezone(tz);
    let now = local.with_timezone(&local.offset().fix());
    parse_date_string(input, now, Dialect::Us)
        .map(|dt| dt.date_naive())
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", input, e))
}

/// Parses a wall-clock time: "07:00", "19:30:00", "7am", "7:15 PM".
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    let lowered = input.trim().to_lowercase();
    let (clock, meridiem) = if let Some(rest) = lowered.strip_suffix("am") {
        (rest.trim(), Some(false))
    } else if let Some(rest) = lowered.strip_suffix("pm") {
        (rest.trim(), Some(true))
    } else {
        (lowered.as_str(), None)
    };

    let mut parts = clock.split(':');
    let hour: u32 = parse_component(parts.next(), input)?;
    let minute: u32 = match parts.next() {
        Some(m) => parse_component(Some(m), input)?,
        None if meridiem.is_some() => 0,
        None => bail!("Invalid time '{}': expected HH:MM", input),
    };
    let second: u32 = match parts.next() {
        Some(s) => parse_component(Some(s), input)?,
        None => 0,
    };
    if parts.next().is_some() {
        bail!("Invalid time '{}'", input);
    }

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                bail!("Invalid time '{}': hour must be 1-12 with am/pm", input);
            }
            (hour % 12) + if pm { 12 } else { 0 }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| anyhow!("Invalid time '{}'", input))
}

fn parse_component(part: Option<&str>, input: &str) -> Result<u32> {
    part.filter(|p| !p.is_empty() && p.len() <= 2)
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| anyhow!("Invalid time '{}'", input))
}

/// Parses "1,15,31" into a set of days of the month.
pub fn parse_month_days(input: &str) -> Result<BTreeSet<u32>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<u32>()
                .map_err(|_| anyhow!("Invalid day of month '{}'", t))
        })
        .collect()
}

/// Parses a yearly date given as "MM-DD" or "MM/DD".
pub fn parse_month_day(input: &str) -> Result<(u32, u32)> {
    let (month, day) = input
        .trim()
        .split_once(['-', '/'])
        .ok_or_else(|| anyhow!("Invalid yearly date '{}': expected MM-DD", input))?;
    let month = month
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid month in '{}'", input))?;
    let day = day
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid day in '{}'", input))?;
    Ok((month, day))
}

/// Builds a recurrence from command line pieces. Missing `on` values fall
/// back to the start date: the same weekday, day of month or anniversary.
pub fn build_recurrence(
    frequency: Frequency,
    interval: u32,
    on: Option<&str>,
    start: NaiveDate,
) -> Result<Recurrence> {
    let recurrence = match frequency {
        Frequency::Once => Recurrence::Never,
        Frequency::Daily => Recurrence::Daily { every: interval },
        Frequency::Weekly => {
            let days = match on {
                Some(days) => days
                    .parse::<WeekdaySet>()
                    .map_err(|e| anyhow!("{}", e))?,
                None => std::iter::once(start.weekday()).collect(),
            };
            Recurrence::Weekly { days }
        }
        Frequency::Monthly => {
            let days = match on {
                Some(days) => parse_month_days(days)?,
                None => BTreeSet::from([start.day()]),
            };
            Recurrence::Monthly { days }
        }
        Frequency::Yearly => {
            let (month, day) = match on {
                Some(date) => parse_month_day(date)?,
                None => (start.month(), start.day()),
            };
            Recurrence::Yearly { month, day }
        }
    };
    Ok(recurrence)
}
