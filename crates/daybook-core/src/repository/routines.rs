use crate::error::CoreError;
use crate::models::{
    NewRoutineData, RecurrenceRule, Routine, RoutineRow, UpdateRoutineData,
};
use crate::recurrence::validate_rule;
use crate::repository::{short_id_pattern, SqliteRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Executor, Sqlite};
use tracing::warn;
use uuid::Uuid;

#[async_trait]
impl super::RoutineRepository for SqliteRepository {
    async fn create_routine(&self, data: NewRoutineData) -> Result<Routine, CoreError> {
        let name = data.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::InvalidInput(
                "Routine name cannot be empty.".to_string(),
            ));
        }

        let rule = RecurrenceRule {
            recurrence: data.recurrence,
            start_date: data.start_date,
            end_date: data.end_date,
        };
        validate_rule(&rule)?;

        let now = Utc::now();
        let routine = Routine {
            id: Uuid::new_v4(),
            name,
            icon: data.icon,
            color: data.color,
            rule,
            window: data.window,
            active: true,
            created_at: now,
            updated_at: now,
        };

        Self::insert_routine(self.pool(), &routine).await?;
        Ok(routine)
    }

    async fn find_routine_by_id(&self, id: Uuid) -> Result<Option<Routine>, CoreError> {
        let row: Option<RoutineRow> = sqlx::query_as("SELECT * FROM routines WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| Routine::try_from(r).map_err(CoreError::InvalidRule))
            .transpose()
    }

    async fn find_routines_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Routine>, CoreError> {
        let Some(pattern) = short_id_pattern(short_id) else {
            return Ok(Vec::new());
        };

        let rows: Vec<RoutineRow> = sqlx::query_as("SELECT * FROM routines WHERE lower(hex(id)) LIKE $1")
            .bind(pattern)
            .fetch_all(self.pool())
            .await?;
        Ok(Self::convert_rows(rows))
    }

    async fn find_routines(&self) -> Result<Vec<Routine>, CoreError> {
        let rows: Vec<RoutineRow> = sqlx::query_as("SELECT * FROM routines ORDER BY created_at")
            .fetch_all(self.pool())
            .await?;
        Ok(Self::convert_rows(rows))
    }

    async fn find_active_routines(&self) -> Result<Vec<Routine>, CoreError> {
        let rows: Vec<RoutineRow> = sqlx::query_as(
            "SELECT * FROM routines WHERE active = TRUE ORDER BY created_at",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(Self::convert_rows(rows))
    }

    async fn update_routine(&self, id: Uuid, data: UpdateRoutineData) -> Result<Routine, CoreError> {
        let mut tx = self.pool().begin().await?;

        let row: RoutineRow = sqlx::query_as("SELECT * FROM routines WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Routine with id {} not found", id)))?;
        let mut routine = Routine::try_from(row).map_err(CoreError::InvalidRule)?;

        if let Some(name) = data.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CoreError::InvalidInput(
                    "Routine name cannot be empty.".to_string(),
                ));
            }
            routine.name = name;
        }
        if let Some(icon) = data.icon {
            routine.icon = icon;
        }
        if let Some(color) = data.color {
            routine.color = color;
        }
        if let Some(recurrence) = data.recurrence {
            routine.rule.recurrence = recurrence;
        }
        if let Some(start_date) = data.start_date {
            routine.rule.start_date = start_date;
        }
        if let Some(end_date) = data.end_date {
            routine.rule.end_date = end_date;
        }
        if let Some(window) = data.window {
            routine.window = window;
        }
        if let Some(active) = data.active {
            routine.active = active;
        }
        validate_rule(&routine.rule)?;
        routine.updated_at = Utc::now();

        let (daily, weekly, monthly, yearly_month, yearly_day) = routine.rule.recurrence.to_columns();
        sqlx::query(
            r#"UPDATE routines
            SET name = $1, icon = $2, color = $3, occurrence_type = $4,
                daily_every_value = $5, weekly_days_selected = $6, monthly_days_selected = $7,
                yearly_month_value = $8, yearly_day_value = $9,
                start_date = $10, end_date = $11, never_ends = $12,
                from_time = $13, to_time = $14, active = $15, updated_at = $16
            WHERE id = $17"#,
        )
        .bind(&routine.name)
        .bind(&routine.icon)
        .bind(&routine.color)
        .bind(routine.rule.recurrence.occurrence_type())
        .bind(daily)
        .bind(weekly)
        .bind(monthly)
        .bind(yearly_month)
        .bind(yearly_day)
        .bind(routine.rule.start_date)
        .bind(routine.rule.end_date)
        .bind(routine.rule.never_ends())
        .bind(routine.window.from)
        .bind(routine.window.to)
        .bind(routine.active)
        .bind(routine.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(routine)
    }

    async fn delete_routine(&self, id: Uuid) -> Result<(), CoreError> {
        // Materialized activities are history and stay behind
        let result = sqlx::query("DELETE FROM routines WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Routine with id {} not found", id)));
        }
        Ok(())
    }
}

impl SqliteRepository {
    async fn insert_routine<'e, E>(executor: E, routine: &Routine) -> Result<(), CoreError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (daily, weekly, monthly, yearly_month, yearly_day) = routine.rule.recurrence.to_columns();
        sqlx::query(
            r#"INSERT INTO routines (id, name, icon, color, occurrence_type,
                daily_every_value, weekly_days_selected, monthly_days_selected,
                yearly_month_value, yearly_day_value,
                start_date, end_date, never_ends, from_time, to_time, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"#,
        )
        .bind(routine.id)
        .bind(&routine.name)
        .bind(&routine.icon)
        .bind(&routine.color)
        .bind(routine.rule.recurrence.occurrence_type())
        .bind(daily)
        .bind(weekly)
        .bind(monthly)
        .bind(yearly_month)
        .bind(yearly_day)
        .bind(routine.rule.start_date)
        .bind(routine.rule.end_date)
        .bind(routine.rule.never_ends())
        .bind(routine.window.from)
        .bind(routine.window.to)
        .bind(routine.active)
        .bind(routine.created_at)
        .bind(routine.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Rows that break the per-type invariant are left out with a warning so
    /// one bad record cannot take the whole listing down.
    fn convert_rows(rows: Vec<RoutineRow>) -> Vec<Routine> {
        rows.into_iter()
            .filter_map(|row| {
                let id = row.id;
                match Routine::try_from(row) {
                    Ok(routine) => Some(routine),
                    Err(reason) => {
                        warn!(routine_id = %id, %reason, "skipping malformed routine row");
                        None
                    }
                }
            })
            .collect()
    }
}
