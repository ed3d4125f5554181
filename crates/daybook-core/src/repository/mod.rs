use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    Activity, NewRoutineData, Routine, StatusFilter, UpdateRoutineData,
};
use crate::recurrence::{MaterializationManager, MaterializationSummary};
use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use uuid::Uuid;

// Re-export domain modules
pub mod activities;
pub mod materialization;
pub mod routines;

// Traits are defined in this module and implemented in respective domain modules

/// Domain-specific trait for routine operations.
///
/// Routines are authored outside the core; the timeline only reads them.
#[async_trait]
pub trait RoutineRepository {
    async fn create_routine(&self, data: NewRoutineData) -> Result<Routine, CoreError>;
    async fn find_routine_by_id(&self, id: Uuid) -> Result<Option<Routine>, CoreError>;
    async fn find_routines_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Routine>, CoreError>;
    async fn find_routines(&self) -> Result<Vec<Routine>, CoreError>;
    async fn find_active_routines(&self) -> Result<Vec<Routine>, CoreError>;
    async fn update_routine(&self, id: Uuid, data: UpdateRoutineData) -> Result<Routine, CoreError>;
    async fn delete_routine(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for materialization operations
#[async_trait]
pub trait MaterializationRepository {
    /// Returns the activity for every requested date inside the routine's
    /// bounds, creating the ones that do not exist yet. Safe to call
    /// repeatedly and concurrently for the same dates.
    async fn ensure_materialized(&self, routine: &Routine, dates: &[NaiveDate], tz: &Tz) -> Result<Vec<Activity>, CoreError>;
    /// Expands every active routine across `[window_start, window_end]`.
    async fn backfill(&self, window_start: NaiveDate, window_end: NaiveDate, tz: &Tz) -> Result<MaterializationSummary, CoreError>;
}

/// Domain-specific trait for activity lifecycle operations
#[async_trait]
pub trait ActivityRepository {
    async fn find_activity_by_id(&self, id: Uuid) -> Result<Option<Activity>, CoreError>;
    async fn find_activities_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Activity>, CoreError>;
    async fn find_activities_for_routine(&self, routine_id: Uuid, start: NaiveDate, end: NaiveDate) -> Result<Vec<Activity>, CoreError>;
    async fn list_by_date_and_status(&self, date: NaiveDate, filter: StatusFilter) -> Result<Vec<Activity>, CoreError>;
    /// `Available -> Completed`, stamping `completed_at`.
    async fn complete_activity(&self, id: Uuid) -> Result<Activity, CoreError>;
    /// `Available -> Skipped`.
    async fn skip_activity(&self, id: Uuid) -> Result<Activity, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository:
    RoutineRepository +
    MaterializationRepository +
    ActivityRepository
{
    // This trait automatically composes all domain-specific repositories
    // Individual domain operations are defined in their respective traits
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    materialization_manager: MaterializationManager,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, materialization_manager: MaterializationManager) -> Self {
        Self { pool, materialization_manager }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a reference to the materialization manager
    pub fn materialization_manager(&self) -> &MaterializationManager {
        &self.materialization_manager
    }
}

/// Turns a user-typed short id into a `LIKE` pattern over the hex form of a
/// stored UUID, or `None` when it cannot match any id.
pub(crate) fn short_id_pattern(short_id: &str) -> Option<String> {
    let hex: String = short_id
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let mut pattern = String::with_capacity(hex.len() + 1);
    pattern.push_str(&hex);
    pattern.push('%');
    Some(pattern)
}

impl Repository for SqliteRepository {}
