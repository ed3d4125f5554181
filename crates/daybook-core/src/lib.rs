//! # Daybook Core Library
//!
//! Turns recurring routines into dated activities and lays a day's
//! activities out on a timeline next to sunrise and sunset.
//!
//! ## Features
//!
//! - **Recurrence Rules**: daily every N days, weekly by weekday set, monthly
//!   by day-of-month set and yearly by month/day, with short months clamped
//! - **Idempotent Materialization**: each (routine, date) pair becomes exactly
//!   one activity no matter how often or how concurrently it is requested
//! - **Guarded Lifecycle**: activities move from available to completed or
//!   skipped exactly once
//! - **Timeline Assembly**: status filtering, grouping by timestamp and a sun
//!   info lookup that degrades quietly
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Data access layer with Repository pattern
//! - [`recurrence`]: Occurrence calculation and backfill planning
//! - [`timeline`]: Timeline assembly
//! - [`sun`]: Sunrise/sunset sources
//! - [`timezone`]: Timezone utilities and validation
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::{NaiveDate, NaiveTime};
//! use daybook_core::{
//!     db,
//!     models::{NewRoutineData, Recurrence, StatusFilter, TimeWindow, UserProfile, WeekdaySet},
//!     recurrence::MaterializationManager,
//!     repository::{RoutineRepository, SqliteRepository},
//!     sun::DisabledSunInfoSource,
//!     timeline::TimelineAssembler,
//! };
//! use chrono::Weekday;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("daybook.db").await?;
//!     let repo = SqliteRepository::new(pool, MaterializationManager::with_defaults());
//!
//!     repo.create_routine(NewRoutineData {
//!         name: "Run".to_string(),
//!         icon: Some("running".to_string()),
//!         color: None,
//!         recurrence: Recurrence::Weekly {
//!             days: [Weekday::Mon, Weekday::Wed, Weekday::Fri].into_iter().collect::<WeekdaySet>(),
//!         },
//!         start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!         end_date: None,
//!         window: TimeWindow {
//!             from: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
//!             to: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
//!         },
//!     })
//!     .await?;
//!
//!     let sun = DisabledSunInfoSource;
//!     let assembler = TimelineAssembler::new(&repo, &sun, UserProfile::default());
//!     let points = assembler
//!         .assemble(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), StatusFilter::All)
//!         .await?;
//!     println!("{} timeline points", points.len());
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod repository;
pub mod sun;
pub mod timeline;
pub mod timezone;
