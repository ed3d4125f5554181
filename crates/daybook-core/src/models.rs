use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Recurrence Models
// ============================================================================

/// Discriminant stored alongside the per-type columns of a routine row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceType {
    Never,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for OccurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OccurrenceType::Never => write!(f, "never"),
            OccurrenceType::Daily => write!(f, "daily"),
            OccurrenceType::Weekly => write!(f, "weekly"),
            OccurrenceType::Monthly => write!(f, "monthly"),
            OccurrenceType::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid occurrence type: {0}")]
pub struct ParseOccurrenceTypeError(String);

impl FromStr for OccurrenceType {
    type Err = ParseOccurrenceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "never" | "once" => Ok(OccurrenceType::Never),
            "daily" => Ok(OccurrenceType::Daily),
            "weekly" => Ok(OccurrenceType::Weekly),
            "monthly" => Ok(OccurrenceType::Monthly),
            "yearly" => Ok(OccurrenceType::Yearly),
            _ => Err(ParseOccurrenceTypeError(s.to_string())),
        }
    }
}

/// Compact set of weekdays, one bit per day counted from Sunday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekdaySet(u8);

const WEEK_ORDER: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

impl WeekdaySet {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    #[inline]
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Days in Sunday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK_ORDER.iter().copied().filter(|d| self.contains(*d))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = WeekdaySet::new();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "SU",
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.iter().map(weekday_code).collect();
        write!(f, "{}", codes.join(","))
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid weekday: {0}")]
pub struct ParseWeekdaySetError(String);

impl FromStr for WeekdaySet {
    type Err = ParseWeekdaySetError;

    /// Accepts comma separated two-letter codes ("MO,WE") as well as the
    /// English names and abbreviations chrono understands ("mon", "Friday").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = WeekdaySet::new();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let day = match token.to_uppercase().as_str() {
                "SU" => Weekday::Sun,
                "MO" => Weekday::Mon,
                "TU" => Weekday::Tue,
                "WE" => Weekday::Wed,
                "TH" => Weekday::Thu,
                "FR" => Weekday::Fri,
                "SA" => Weekday::Sat,
                _ => token
                    .parse::<Weekday>()
                    .map_err(|_| ParseWeekdaySetError(token.to_string()))?,
            };
            set.insert(day);
        }
        Ok(set)
    }
}

impl From<WeekdaySet> for String {
    fn from(set: WeekdaySet) -> Self {
        set.to_string()
    }
}

impl TryFrom<String> for WeekdaySet {
    type Error = ParseWeekdaySetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How a routine repeats. Each variant carries only the fields that matter
/// for its occurrence type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Recurrence {
    /// A single occurrence on the rule's start date.
    Never,
    Daily { every: u32 },
    Weekly { days: WeekdaySet },
    Monthly { days: BTreeSet<u32> },
    Yearly { month: u32, day: u32 },
}

impl Recurrence {
    pub fn occurrence_type(&self) -> OccurrenceType {
        match self {
            Recurrence::Never => OccurrenceType::Never,
            Recurrence::Daily { .. } => OccurrenceType::Daily,
            Recurrence::Weekly { .. } => OccurrenceType::Weekly,
            Recurrence::Monthly { .. } => OccurrenceType::Monthly,
            Recurrence::Yearly { .. } => OccurrenceType::Yearly,
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Never => write!(f, "once"),
            Recurrence::Daily { every: 1 } => write!(f, "every day"),
            Recurrence::Daily { every } => write!(f, "every {} days", every),
            Recurrence::Weekly { days } => write!(f, "weekly on {}", days),
            Recurrence::Monthly { days } => {
                let days: Vec<String> = days.iter().map(u32::to_string).collect();
                write!(f, "monthly on day {}", days.join(","))
            }
            Recurrence::Yearly { month, day } => write!(f, "yearly on {:02}-{:02}", month, day),
        }
    }
}

/// The immutable definition of when a routine occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub recurrence: Recurrence,
    /// Inclusive lower bound
    pub start_date: NaiveDate,
    /// Inclusive upper bound; `None` means the rule never ends
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceRule {
    pub fn never_ends(&self) -> bool {
        self.end_date.is_none()
    }

    /// Whether `date` lies inside `[start_date, end_date]`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }
}

/// Wall-clock window applied to every occurrence of a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl TimeWindow {
    /// A window whose end is earlier than its start runs past midnight.
    pub fn crosses_midnight(&self) -> bool {
        self.to < self.from
    }
}

// ============================================================================
// Routine Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routine {
    pub id: Uuid,
    pub name: String,
    /// Opaque presentation keys, resolved by whoever renders the timeline
    pub icon: Option<String>,
    pub color: Option<String>,
    pub rule: RecurrenceRule,
    pub window: TimeWindow,
    /// Paused routines are not expanded
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat storage shape of a routine: one nullable column group per occurrence type.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct RoutineRow {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub occurrence_type: OccurrenceType,
    pub daily_every_value: Option<i64>,
    pub weekly_days_selected: Option<String>,
    pub monthly_days_selected: Option<String>,
    pub yearly_month_value: Option<i64>,
    pub yearly_day_value: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub never_ends: bool,
    pub from_time: NaiveTime,
    pub to_time: NaiveTime,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn required<T>(value: Option<T>, column: &str, kind: OccurrenceType) -> Result<T, String> {
    value.ok_or_else(|| format!("{} routine is missing {}", kind, column))
}

fn positive_u32(value: i64, column: &str) -> Result<u32, String> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| format!("{} must be a positive integer, got {}", column, value))
}

impl TryFrom<RoutineRow> for Routine {
    type Error = String;

    fn try_from(row: RoutineRow) -> Result<Self, Self::Error> {
        let kind = row.occurrence_type;

        // Only the group owned by the row's type may hold values
        let groups = [
            ("daily_every_value", OccurrenceType::Daily, row.daily_every_value.is_some()),
            ("weekly_days_selected", OccurrenceType::Weekly, row.weekly_days_selected.is_some()),
            ("monthly_days_selected", OccurrenceType::Monthly, row.monthly_days_selected.is_some()),
            ("yearly_month_value", OccurrenceType::Yearly, row.yearly_month_value.is_some()),
            ("yearly_day_value", OccurrenceType::Yearly, row.yearly_day_value.is_some()),
        ];
        if let Some((column, _, _)) = groups.iter().find(|(_, owner, set)| *set && *owner != kind) {
            return Err(format!("{} routine must not set {}", kind, column));
        }

        let recurrence = match kind {
            OccurrenceType::Never => Recurrence::Never,
            OccurrenceType::Daily => Recurrence::Daily {
                every: positive_u32(
                    required(row.daily_every_value, "daily_every_value", kind)?,
                    "daily_every_value",
                )?,
            },
            OccurrenceType::Weekly => Recurrence::Weekly {
                days: required(row.weekly_days_selected, "weekly_days_selected", kind)?
                    .parse()
                    .map_err(|e: ParseWeekdaySetError| e.to_string())?,
            },
            OccurrenceType::Monthly => {
                let raw = required(row.monthly_days_selected, "monthly_days_selected", kind)?;
                let days = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| {
                        t.parse::<u32>()
                            .map_err(|_| format!("Invalid day of month '{}'", t))
                    })
                    .collect::<Result<BTreeSet<u32>, String>>()?;
                Recurrence::Monthly { days }
            }
            OccurrenceType::Yearly => Recurrence::Yearly {
                month: positive_u32(
                    required(row.yearly_month_value, "yearly_month_value", kind)?,
                    "yearly_month_value",
                )?,
                day: positive_u32(
                    required(row.yearly_day_value, "yearly_day_value", kind)?,
                    "yearly_day_value",
                )?,
            },
        };

        let end_date = if row.never_ends {
            None
        } else {
            Some(row.end_date.ok_or_else(|| {
                "end_date is required unless the routine never ends".to_string()
            })?)
        };

        Ok(Routine {
            id: row.id,
            name: row.name,
            icon: row.icon,
            color: row.color,
            rule: RecurrenceRule {
                recurrence,
                start_date: row.start_date,
                end_date,
            },
            window: TimeWindow {
                from: row.from_time,
                to: row.to_time,
            },
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Column values for the per-type group of a recurrence, in storage order:
/// (daily_every, weekly_days, monthly_days, yearly_month, yearly_day).
pub(crate) type RecurrenceColumns = (
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<i64>,
);

impl Recurrence {
    pub(crate) fn to_columns(&self) -> RecurrenceColumns {
        match self {
            Recurrence::Never => (None, None, None, None, None),
            Recurrence::Daily { every } => (Some(*every as i64), None, None, None, None),
            Recurrence::Weekly { days } => (None, Some(days.to_string()), None, None, None),
            Recurrence::Monthly { days } => {
                let joined = days.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
                (None, None, Some(joined), None, None)
            }
            Recurrence::Yearly { month, day } => {
                (None, None, None, Some(*month as i64), Some(*day as i64))
            }
        }
    }
}

/// Data supplied by the routine-authoring workflow
#[derive(Debug, Clone)]
pub struct NewRoutineData {
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub recurrence: Recurrence,
    pub start_date: NaiveDate,
    /// `None` means the routine never ends
    pub end_date: Option<NaiveDate>,
    pub window: TimeWindow,
}

/// Partial routine update. Only affects occurrences materialized afterwards.
#[derive(Debug, Clone, Default)]
pub struct UpdateRoutineData {
    pub name: Option<String>,
    pub icon: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub recurrence: Option<Recurrence>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub window: Option<TimeWindow>,
    pub active: Option<bool>,
}

// ============================================================================
// Activity Models
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Available,
    Completed,
    Skipped,
}

impl ActivityStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActivityStatus::Available)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityStatus::Available => write!(f, "available"),
            ActivityStatus::Completed => write!(f, "completed"),
            ActivityStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid activity status: {0}")]
pub struct ParseActivityStatusError(String);

impl FromStr for ActivityStatus {
    type Err = ParseActivityStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(ActivityStatus::Available),
            "completed" | "done" => Ok(ActivityStatus::Completed),
            "skipped" => Ok(ActivityStatus::Skipped),
            _ => Err(ParseActivityStatusError(s.to_string())),
        }
    }
}

/// The materialized record of one routine occurrence.
///
/// Name, icon and color are copied from the routine when the activity is
/// created, so history keeps its labels after the routine is edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub routine_id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub occurrence_date: NaiveDate,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: ActivityStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status selector for activity queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Available,
    Completed,
    Skipped,
}

impl StatusFilter {
    /// The single status this filter selects, or `None` for `All`.
    pub fn status(&self) -> Option<ActivityStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Available => Some(ActivityStatus::Available),
            StatusFilter::Completed => Some(ActivityStatus::Completed),
            StatusFilter::Skipped => Some(ActivityStatus::Skipped),
        }
    }

    pub fn matches(&self, status: ActivityStatus) -> bool {
        self.status().map_or(true, |s| s == status)
    }
}

impl From<ActivityStatus> for StatusFilter {
    fn from(status: ActivityStatus) -> Self {
        match status {
            ActivityStatus::Available => StatusFilter::Available,
            ActivityStatus::Completed => StatusFilter::Completed,
            ActivityStatus::Skipped => StatusFilter::Skipped,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status() {
            Some(status) => fmt::Display::fmt(&status, f),
            None => f.write_str("all"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseActivityStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse::<ActivityStatus>().map(StatusFilter::from)
    }
}

// ============================================================================
// Timeline Models
// ============================================================================

/// The owner of a timeline: a single IANA zone and optional coordinates for
/// sunrise/sunset lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub timezone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl UserProfile {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            latitude: None,
            longitude: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SunInfo {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub day_length: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Activity,
    Sunrise,
    Sunset,
}

/// One display item on a timeline: an activity or an ambient fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: EntryKind,
    pub label: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Absent for sunrise and sunset
    pub status: Option<ActivityStatus>,
    pub activity_id: Option<Uuid>,
    pub end_at: Option<DateTime<Utc>>,
}

impl TimelineEntry {
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            timestamp: activity.start_at,
            kind: EntryKind::Activity,
            label: activity.name.clone(),
            icon: activity.icon.clone(),
            color: activity.color.clone(),
            status: Some(activity.status),
            activity_id: Some(activity.id),
            end_at: Some(activity.end_at),
        }
    }

    pub fn sunrise(at: DateTime<Utc>) -> Self {
        Self::ambient(at, EntryKind::Sunrise, "Sunrise", "sunrise", "amber")
    }

    pub fn sunset(at: DateTime<Utc>) -> Self {
        Self::ambient(at, EntryKind::Sunset, "Sunset", "sunset", "indigo")
    }

    fn ambient(at: DateTime<Utc>, kind: EntryKind, label: &str, icon: &str, color: &str) -> Self {
        Self {
            timestamp: at,
            kind,
            label: label.to_string(),
            icon: Some(icon.to_string()),
            color: Some(color.to_string()),
            status: None,
            activity_id: None,
            end_at: None,
        }
    }
}

/// All entries sharing one exact timestamp, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<TimelineEntry>,
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for materialization behavior - core version
/// This is separate from the CLI config to allow for type differences
#[derive(Debug, Clone)]
pub struct MaterializationConfig {
    /// Days ahead of today covered by a backfill sweep
    pub lookahead_days: i64,
    /// Days before today covered by a backfill sweep
    pub grace_days: i64,
    /// Cap on activities created per routine in one sweep
    pub max_batch_size: usize,
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self {
            lookahead_days: 14,
            grace_days: 1,
            max_batch_size: 500,
        }
    }
}
