//! Timeline assembly: one day's activities merged with sunrise and sunset.

use crate::error::CoreError;
use crate::models::{StatusFilter, SunInfo, TimelineEntry, TimelinePoint, UserProfile};
use crate::recurrence::candidate_dates;
use crate::repository::Repository;
use crate::sun::{SunInfoError, SunInfoSource};
use crate::timezone::parse_timezone;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TimelineConfig {
    /// Upper bound on the sun info lookup; past it the timeline goes without.
    pub sun_timeout: Duration,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            sun_timeout: Duration::from_secs(5),
        }
    }
}

pub struct TimelineAssembler<'a, R: Repository + Sync + ?Sized> {
    repo: &'a R,
    sun_source: &'a dyn SunInfoSource,
    profile: UserProfile,
    config: TimelineConfig,
}

impl<'a, R: Repository + Sync + ?Sized> TimelineAssembler<'a, R> {
    pub fn new(repo: &'a R, sun_source: &'a dyn SunInfoSource, profile: UserProfile) -> Self {
        Self {
            repo,
            sun_source,
            profile,
            config: TimelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TimelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Builds the timeline for `date`.
    ///
    /// Every active routine due on `date` is materialized first, so reading a
    /// day is what brings its activities into existence. Sun info that cannot
    /// be fetched is dropped, never reported.
    pub async fn assemble(
        &self,
        date: NaiveDate,
        filter: StatusFilter,
    ) -> Result<Vec<TimelinePoint>, CoreError> {
        let tz = parse_timezone(&self.profile.timezone)?;

        for routine in self.repo.find_active_routines().await? {
            let dates = match candidate_dates(&routine.rule, date, date) {
                Ok(dates) => dates,
                Err(CoreError::InvalidRule(reason)) => {
                    warn!(routine_id = %routine.id, %reason, "routine has an invalid rule, leaving it off the timeline");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !dates.is_empty() {
                self.repo.ensure_materialized(&routine, &dates, &tz).await?;
            }
        }

        let activities = self.repo.list_by_date_and_status(date, filter).await?;
        let mut entries: Vec<TimelineEntry> =
            activities.iter().map(TimelineEntry::from_activity).collect();

        match self.sun_info(date).await {
            Ok(sun) => {
                entries.push(TimelineEntry::sunrise(sun.sunrise));
                entries.push(TimelineEntry::sunset(sun.sunset));
            }
            Err(SunInfoError::Disabled) => {}
            Err(SunInfoError::NoCoordinates) => {
                debug!(%date, "no coordinates in profile, skipping sun info");
            }
            Err(e) => warn!(%date, error = %e, "sun info unavailable, timeline goes without it"),
        }

        debug!(%date, %filter, entries = entries.len(), "assembled timeline");
        Ok(group_into_points(entries))
    }

    async fn sun_info(&self, date: NaiveDate) -> Result<SunInfo, SunInfoError> {
        let (latitude, longitude) = self
            .profile
            .coordinates()
            .ok_or(SunInfoError::NoCoordinates)?;

        tokio::time::timeout(
            self.config.sun_timeout,
            self.sun_source.fetch_sun_info(date, latitude, longitude),
        )
        .await
        .map_err(|_| SunInfoError::Timeout)?
    }
}

/// Groups entries by exact timestamp, latest first. Entries sharing a
/// timestamp keep the order they were given in.
pub fn group_into_points(entries: Vec<TimelineEntry>) -> Vec<TimelinePoint> {
    let mut grouped: BTreeMap<DateTime<Utc>, Vec<TimelineEntry>> = BTreeMap::new();
    for entry in entries {
        grouped.entry(entry.timestamp).or_default().push(entry);
    }

    grouped
        .into_iter()
        .rev()
        .map(|(timestamp, entries)| TimelinePoint { timestamp, entries })
        .collect()
}
