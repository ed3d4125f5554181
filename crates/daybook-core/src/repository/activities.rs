use crate::error::CoreError;
use crate::models::{Activity, ActivityStatus, StatusFilter};
use crate::repository::{short_id_pattern, ActivityRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

#[async_trait]
impl ActivityRepository for SqliteRepository {
    async fn find_activity_by_id(&self, id: Uuid) -> Result<Option<Activity>, CoreError> {
        let activity = sqlx::query_as("SELECT * FROM activities WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(activity)
    }

    async fn find_activities_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Activity>, CoreError> {
        let Some(pattern) = short_id_pattern(short_id) else {
            return Ok(Vec::new());
        };

        let activities = sqlx::query_as("SELECT * FROM activities WHERE lower(hex(id)) LIKE $1")
            .bind(pattern)
            .fetch_all(self.pool())
            .await?;
        Ok(activities)
    }

    async fn find_activities_for_routine(&self, routine_id: Uuid, start: NaiveDate, end: NaiveDate) -> Result<Vec<Activity>, CoreError> {
        let activities = sqlx::query_as(
            r#"SELECT * FROM activities
            WHERE routine_id = $1 AND occurrence_date >= $2 AND occurrence_date <= $3
            ORDER BY occurrence_date"#,
        )
        .bind(routine_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;
        Ok(activities)
    }

    async fn list_by_date_and_status(&self, date: NaiveDate, filter: StatusFilter) -> Result<Vec<Activity>, CoreError> {
        let mut activities: Vec<Activity> = match filter.status() {
            Some(status) => {
                sqlx::query_as("SELECT * FROM activities WHERE occurrence_date = $1 AND status = $2")
                    .bind(date)
                    .bind(status)
                    .fetch_all(self.pool())
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM activities WHERE occurrence_date = $1")
                    .bind(date)
                    .fetch_all(self.pool())
                    .await?
            }
        };

        activities.sort_by(|a, b| {
            a.start_at
                .cmp(&b.start_at)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(activities)
    }

    async fn complete_activity(&self, id: Uuid) -> Result<Activity, CoreError> {
        self.transition_activity(id, ActivityStatus::Completed).await
    }

    async fn skip_activity(&self, id: Uuid) -> Result<Activity, CoreError> {
        self.transition_activity(id, ActivityStatus::Skipped).await
    }
}

impl SqliteRepository {
    /// Moves an available activity into a terminal state. The status guard
    /// lives in the `WHERE` clause so two racing callers cannot both win.
    async fn transition_activity(&self, id: Uuid, to: ActivityStatus) -> Result<Activity, CoreError> {
        let now = Utc::now();
        let completed_at = (to == ActivityStatus::Completed).then_some(now);

        let updated: Option<Activity> = sqlx::query_as(
            r#"UPDATE activities
            SET status = $1, completed_at = $2, updated_at = $3
            WHERE id = $4 AND status = $5
            RETURNING *"#,
        )
        .bind(to)
        .bind(completed_at)
        .bind(now)
        .bind(id)
        .bind(ActivityStatus::Available)
        .fetch_optional(self.pool())
        .await?;

        if let Some(activity) = updated {
            debug!(activity_id = %id, status = %to, "activity transitioned");
            return Ok(activity);
        }

        match self.find_activity_by_id(id).await? {
            Some(existing) => Err(CoreError::InvalidTransition {
                id: id.to_string(),
                from: existing.status,
                to,
            }),
            None => Err(CoreError::NotFound(format!("Activity with id {} not found", id))),
        }
    }
}
