use crate::error::CoreError;
use crate::models::{Activity, ActivityStatus, Routine};
use crate::recurrence::{candidate_dates, validate_rule, MaterializationSummary};
use crate::repository::{RoutineRepository, SqliteRepository};
use crate::timezone::occurrence_bounds;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use sqlx::{Sqlite, Transaction};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[async_trait]
impl super::MaterializationRepository for SqliteRepository {
    async fn ensure_materialized(&self, routine: &Routine, dates: &[NaiveDate], tz: &Tz) -> Result<Vec<Activity>, CoreError> {
        validate_rule(&routine.rule)?;

        let mut wanted: Vec<NaiveDate> = dates
            .iter()
            .copied()
            .filter(|d| routine.rule.covers(*d))
            .collect();
        wanted.sort_unstable();
        wanted.dedup();

        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool().begin().await?;
        let (activities, created) = Self::materialize_dates_in_transaction(&mut tx, routine, &wanted, tz).await?;
        tx.commit().await?;

        debug!(
            routine_id = %routine.id,
            requested = wanted.len(),
            created,
            "materialized routine occurrences"
        );
        Ok(activities)
    }

    async fn backfill(&self, window_start: NaiveDate, window_end: NaiveDate, tz: &Tz) -> Result<MaterializationSummary, CoreError> {
        let started = Instant::now();
        let max_batch_size = self.materialization_manager().config().max_batch_size;
        let mut summary = MaterializationSummary::default();

        let active_routines = self.find_active_routines().await?;

        for routine in active_routines {
            summary.routines_processed += 1;

            let dates = match candidate_dates(&routine.rule, window_start, window_end) {
                Ok(dates) => dates,
                Err(e @ CoreError::InvalidRule(_)) => {
                    warn!(routine_id = %routine.id, error = %e, "skipping routine during backfill");
                    summary.routines_with_errors += 1;
                    summary.errors.push(format!("{}: {}", routine.name, e));
                    continue;
                }
                Err(e) => return Err(e),
            };
            let dates: Vec<NaiveDate> = dates.into_iter().take(max_batch_size).collect();
            if dates.is_empty() {
                continue;
            }

            let mut tx = self.pool().begin().await?;
            let (_, created) = Self::materialize_dates_in_transaction(&mut tx, &routine, &dates, tz).await?;
            tx.commit().await?;

            summary.activities_created += created;
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            routines = summary.routines_processed,
            created = summary.activities_created,
            errors = summary.routines_with_errors,
            duration_ms = summary.duration_ms,
            "backfill finished"
        );
        Ok(summary)
    }
}

impl SqliteRepository {
    /// Inserts the missing activities for `dates` within an existing
    /// transaction and returns every activity for those dates together with
    /// the number actually created.
    pub(crate) async fn materialize_dates_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        routine: &Routine,
        dates: &[NaiveDate],
        tz: &Tz,
    ) -> Result<(Vec<Activity>, usize), CoreError> {
        let mut activities = Vec::with_capacity(dates.len());
        let mut created_count = 0;

        for &date in dates {
            let (start_at, end_at) = occurrence_bounds(date, &routine.window, tz);
            let now = Utc::now();

            // The unique (routine_id, occurrence_date) key makes this the only
            // writer that wins; everyone else falls through to the read below.
            let result = sqlx::query(
                r#"INSERT INTO activities (id, routine_id, name, icon, color, occurrence_date, start_at, end_at, status, completed_at, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10, $11)
                ON CONFLICT (routine_id, occurrence_date) DO NOTHING"#,
            )
            .bind(Uuid::new_v4())
            .bind(routine.id)
            .bind(&routine.name)
            .bind(&routine.icon)
            .bind(&routine.color)
            .bind(date)
            .bind(start_at)
            .bind(end_at)
            .bind(ActivityStatus::Available)
            .bind(now)
            .bind(now)
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() > 0 {
                created_count += 1;
            }

            let activity: Activity = sqlx::query_as(
                "SELECT * FROM activities WHERE routine_id = $1 AND occurrence_date = $2",
            )
            .bind(routine.id)
            .bind(date)
            .fetch_one(&mut **tx)
            .await?;

            activities.push(activity);
        }

        Ok((activities, created_count))
    }
}
