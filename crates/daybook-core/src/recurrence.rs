use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;

use crate::error::CoreError;
use crate::models::{Recurrence, RecurrenceRule};

pub use crate::models::MaterializationConfig;

/// How far ahead `preview_occurrences` searches before giving up.
const PREVIEW_HORIZON_YEARS: i32 = 50;

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Checks the structural invariants of a rule.
///
/// Authoring validates routines before they reach storage, but every
/// expansion re-checks so that a malformed row fails fast instead of
/// producing nonsense or looping.
pub fn validate_rule(rule: &RecurrenceRule) -> Result<(), CoreError> {
    if let Some(end) = rule.end_date {
        if end < rule.start_date {
            return Err(CoreError::InvalidRule(format!(
                "end date {} is before start date {}",
                end, rule.start_date
            )));
        }
    }

    match &rule.recurrence {
        Recurrence::Never => {}
        Recurrence::Daily { every } => {
            if *every == 0 {
                return Err(CoreError::InvalidRule(
                    "daily interval must be at least 1".to_string(),
                ));
            }
        }
        Recurrence::Weekly { days } => {
            if days.is_empty() {
                return Err(CoreError::InvalidRule(
                    "weekly routine needs at least one weekday".to_string(),
                ));
            }
        }
        Recurrence::Monthly { days } => {
            if days.is_empty() {
                return Err(CoreError::InvalidRule(
                    "monthly routine needs at least one day of month".to_string(),
                ));
            }
            if let Some(bad) = days.iter().find(|d| !(1..=31).contains(*d)) {
                return Err(CoreError::InvalidRule(format!(
                    "day of month {} is outside 1-31",
                    bad
                )));
            }
        }
        Recurrence::Yearly { month, day } => {
            if !(1..=12).contains(month) {
                return Err(CoreError::InvalidRule(format!(
                    "month {} is outside 1-12",
                    month
                )));
            }
            if !(1..=31).contains(day) {
                return Err(CoreError::InvalidRule(format!(
                    "day {} is outside 1-31",
                    day
                )));
            }
        }
    }

    Ok(())
}

/// Dates on which `rule` occurs within `[range_start, range_end]`.
///
/// The result is ascending and free of duplicates. Days of month beyond a
/// month's length fall on that month's last day.
pub fn candidate_dates(
    rule: &RecurrenceRule,
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Result<Vec<NaiveDate>, CoreError> {
    validate_rule(rule)?;

    if range_end < range_start {
        return Err(CoreError::InvalidInput(format!(
            "range end {} is before range start {}",
            range_end, range_start
        )));
    }

    let lo = range_start.max(rule.start_date);
    let hi = rule.end_date.map_or(range_end, |end| end.min(range_end));
    if lo > hi {
        return Ok(Vec::new());
    }

    let dates = match &rule.recurrence {
        Recurrence::Never => vec![rule.start_date]
            .into_iter()
            .filter(|d| *d >= lo && *d <= hi)
            .collect(),
        Recurrence::Daily { every } => daily_dates(rule.start_date, *every, lo, hi),
        Recurrence::Weekly { days } => lo
            .iter_days()
            .take_while(|d| *d <= hi)
            .filter(|d| days.contains(d.weekday()))
            .collect(),
        Recurrence::Monthly { days } => monthly_dates(days, lo, hi),
        Recurrence::Yearly { month, day } => (lo.year()..=hi.year())
            .filter_map(|year| {
                NaiveDate::from_ymd_opt(year, *month, (*day).min(days_in_month(year, *month)))
            })
            .filter(|d| *d >= lo && *d <= hi)
            .collect(),
    };

    Ok(dates)
}

fn daily_dates(anchor: NaiveDate, every: u32, lo: NaiveDate, hi: NaiveDate) -> Vec<NaiveDate> {
    let step = i64::from(every);
    // First k with anchor + k*step >= lo
    let offset = (lo - anchor).num_days();
    let k = (offset + step - 1) / step;

    let mut dates = Vec::new();
    let mut current = anchor.checked_add_signed(Duration::days(k * step));
    while let Some(date) = current {
        if date > hi {
            break;
        }
        dates.push(date);
        current = date.checked_add_signed(Duration::days(step));
    }
    dates
}

fn monthly_dates(days: &BTreeSet<u32>, lo: NaiveDate, hi: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = BTreeSet::new();
    let (mut year, mut month) = (lo.year(), lo.month());

    loop {
        let last = days_in_month(year, month);
        for day in days {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, (*day).min(last)) {
                if date >= lo && date <= hi {
                    dates.insert(date);
                }
            }
        }

        if (year, month) >= (hi.year(), hi.month()) {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    dates.into_iter().collect()
}

/// Whether `rule` has an occurrence on `date`.
pub fn occurs_on(rule: &RecurrenceRule, date: NaiveDate) -> Result<bool, CoreError> {
    Ok(!candidate_dates(rule, date, date)?.is_empty())
}

/// The next `count` occurrences on or after `from`, for authoring previews.
pub fn preview_occurrences(
    rule: &RecurrenceRule,
    from: NaiveDate,
    count: usize,
) -> Result<Vec<NaiveDate>, CoreError> {
    validate_rule(rule)?;

    let mut result = Vec::with_capacity(count.min(64));
    let mut window_start = from;

    for _ in 0..PREVIEW_HORIZON_YEARS {
        if result.len() >= count {
            break;
        }
        if rule.end_date.map_or(false, |end| window_start > end) {
            break;
        }
        let window_end = match window_start.checked_add_signed(Duration::days(365)) {
            Some(end) => end,
            None => break,
        };

        let dates = candidate_dates(rule, window_start, window_end)?;
        let remaining = count - result.len();
        result.extend(dates.into_iter().take(remaining));

        window_start = match window_end.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    Ok(result)
}

// ============================================================================
// MaterializationManager
// ============================================================================

/// Statistics collected during a backfill sweep
#[derive(Debug, Clone, Default)]
pub struct MaterializationSummary {
    /// Number of routines processed
    pub routines_processed: usize,
    /// Total activities created across all routines
    pub activities_created: usize,
    /// Number of routines that had errors
    pub routines_with_errors: usize,
    /// Detailed error messages
    pub errors: Vec<String>,
    /// Time taken for the operation
    pub duration_ms: u64,
}

/// MaterializationManager: decides which dates a backfill sweep covers and
/// how much it may create at once.
///
/// Timeline reads materialize lazily for the day they look at; the sweep is
/// an optional way to have upcoming activities exist ahead of time.
#[derive(Debug, Clone)]
pub struct MaterializationManager {
    /// Configuration for materialization policies
    config: MaterializationConfig,
}

impl MaterializationManager {
    /// Creates a new MaterializationManager with the given configuration.
    pub fn new(config: MaterializationConfig) -> Self {
        Self { config }
    }

    /// Creates a MaterializationManager with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MaterializationConfig::default())
    }

    /// The inclusive date window a sweep starting on `today` covers:
    /// `grace_days` into the past through `lookahead_days` into the future.
    pub fn backfill_window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let grace = self.config.grace_days.max(0);
        let lookahead = self.config.lookahead_days.max(0);
        let start = today
            .checked_sub_signed(Duration::days(grace))
            .unwrap_or(today);
        let end = today
            .checked_add_signed(Duration::days(lookahead))
            .unwrap_or(today);
        (start, end)
    }

    /// Gets the current configuration.
    pub fn config(&self) -> &MaterializationConfig {
        &self.config
    }

    /// Updates the configuration for this materialization manager.
    pub fn update_config(&mut self, config: MaterializationConfig) {
        self.config = config;
    }
}
