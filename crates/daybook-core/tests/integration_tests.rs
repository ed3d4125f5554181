use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use daybook_core::db::establish_connection;
use daybook_core::error::CoreError;
use daybook_core::models::*;
use daybook_core::recurrence::*;
use daybook_core::repository::{
    ActivityRepository, MaterializationRepository, RoutineRepository, SqliteRepository,
};
use daybook_core::sun::{SunInfoError, SunInfoSource};
use daybook_core::timeline::{TimelineAssembler, TimelineConfig};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

/// Helper function to create a test database
async fn setup_test_db() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    let materialization_manager = MaterializationManager::with_defaults();
    let repository = SqliteRepository::new(pool, materialization_manager);

    (repository, temp_dir)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn utc() -> Tz {
    chrono_tz::UTC
}

/// Helper function to create a test routine with a 07:00-08:00 window
async fn create_test_routine(
    repo: &SqliteRepository,
    name: &str,
    recurrence: Recurrence,
    start_date: NaiveDate,
) -> Routine {
    repo.create_routine(NewRoutineData {
        name: name.to_string(),
        icon: Some("star".to_string()),
        color: Some("blue".to_string()),
        recurrence,
        start_date,
        end_date: None,
        window: TimeWindow {
            from: time(7, 0),
            to: time(8, 0),
        },
    })
    .await
    .expect("Failed to create test routine")
}

fn mon_wed_fri() -> Recurrence {
    Recurrence::Weekly {
        days: [Weekday::Mon, Weekday::Wed, Weekday::Fri].into_iter().collect(),
    }
}

struct FixedSun(SunInfo);

#[async_trait]
impl SunInfoSource for FixedSun {
    async fn fetch_sun_info(&self, _: NaiveDate, _: f64, _: f64) -> Result<SunInfo, SunInfoError> {
        Ok(self.0.clone())
    }
}

struct FailingSun;

#[async_trait]
impl SunInfoSource for FailingSun {
    async fn fetch_sun_info(&self, _: NaiveDate, _: f64, _: f64) -> Result<SunInfo, SunInfoError> {
        Err(SunInfoError::Status("500 Internal Server Error".to_string()))
    }
}

struct SlowSun;

#[async_trait]
impl SunInfoSource for SlowSun {
    async fn fetch_sun_info(&self, _: NaiveDate, _: f64, _: f64) -> Result<SunInfo, SunInfoError> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Err(SunInfoError::Timeout)
    }
}

fn located_profile() -> UserProfile {
    UserProfile {
        timezone: "UTC".to_string(),
        latitude: Some(52.52),
        longitude: Some(13.40),
    }
}

fn sun_for(day: NaiveDate) -> SunInfo {
    let sunrise = Utc.from_utc_datetime(&day.and_time(time(6, 45)));
    let sunset = Utc.from_utc_datetime(&day.and_time(time(16, 10)));
    SunInfo {
        sunrise,
        sunset,
        day_length: sunset - sunrise,
    }
}

fn activity_entries(points: &[TimelinePoint]) -> Vec<&TimelineEntry> {
    points
        .iter()
        .flat_map(|p| p.entries.iter())
        .filter(|e| e.kind == EntryKind::Activity)
        .collect()
}

fn ambient_count(points: &[TimelinePoint]) -> usize {
    points
        .iter()
        .flat_map(|p| p.entries.iter())
        .filter(|e| e.kind != EntryKind::Activity)
        .count()
}

#[tokio::test]
async fn test_weekly_routine_materializes_only_on_selected_days() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(&repo, "Run", mon_wed_fri(), date(2024, 1, 1)).await;

    let sun = FailingSun;
    let assembler = TimelineAssembler::new(&repo, &sun, UserProfile::default());

    let wednesday = assembler.assemble(date(2024, 1, 3), StatusFilter::All).await.unwrap();
    let entries = activity_entries(&wednesday);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].label, "Run");
    assert_eq!(entries[0].status, Some(ActivityStatus::Available));
    assert_eq!(entries[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 3, 7, 0, 0).unwrap());

    let tuesday = assembler.assemble(date(2024, 1, 2), StatusFilter::All).await.unwrap();
    assert!(activity_entries(&tuesday).is_empty());

    let stored = repo
        .find_activities_for_routine(routine.id, date(2024, 1, 1), date(2024, 1, 7))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].occurrence_date, date(2024, 1, 3));
}

#[tokio::test]
async fn test_monthly_day_31_lands_on_last_day_of_short_months() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(
        &repo,
        "Pay rent",
        Recurrence::Monthly { days: BTreeSet::from([31]) },
        date(2024, 1, 1),
    )
    .await;

    for (start, end, expected) in [
        (date(2024, 2, 1), date(2024, 2, 29), date(2024, 2, 29)),
        (date(2024, 4, 1), date(2024, 4, 30), date(2024, 4, 30)),
    ] {
        let dates = candidate_dates(&routine.rule, start, end).unwrap();
        repo.ensure_materialized(&routine, &dates, &utc()).await.unwrap();

        let stored = repo.find_activities_for_routine(routine.id, start, end).await.unwrap();
        assert_eq!(stored.len(), 1, "one activity in {}", start.format("%B"));
        assert_eq!(stored[0].occurrence_date, expected);
    }
}

#[tokio::test]
async fn test_timeline_reads_clamp_monthly_day_31() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(
        &repo,
        "Pay rent",
        Recurrence::Monthly { days: BTreeSet::from([31]) },
        date(2024, 1, 1),
    )
    .await;

    let sun = FailingSun;
    let assembler = TimelineAssembler::new(&repo, &sun, UserProfile::default());

    for (last_day, day_before) in [
        (date(2024, 2, 29), date(2024, 2, 28)),
        (date(2024, 4, 30), date(2024, 4, 29)),
    ] {
        let points = assembler.assemble(last_day, StatusFilter::All).await.unwrap();
        let entries = activity_entries(&points);
        assert_eq!(entries.len(), 1, "one activity on {}", last_day);
        assert_eq!(entries[0].label, "Pay rent");
        assert_eq!(
            entries[0].timestamp,
            Utc.from_utc_datetime(&last_day.and_time(time(7, 0)))
        );

        let earlier = assembler.assemble(day_before, StatusFilter::All).await.unwrap();
        assert!(activity_entries(&earlier).is_empty());
    }

    let stored = repo
        .find_activities_for_routine(routine.id, date(2024, 2, 1), date(2024, 4, 30))
        .await
        .unwrap();
    let dates: Vec<_> = stored.iter().map(|a| a.occurrence_date).collect();
    assert_eq!(dates, vec![date(2024, 2, 29), date(2024, 4, 30)]);
}

#[tokio::test]
async fn test_complete_then_skip_is_rejected() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(&repo, "Stretch", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;
    let activities = repo
        .ensure_materialized(&routine, &[date(2024, 1, 5)], &utc())
        .await
        .unwrap();
    let activity = &activities[0];
    assert_eq!(activity.status, ActivityStatus::Available);
    assert!(activity.completed_at.is_none());

    let completed = repo.complete_activity(activity.id).await.unwrap();
    assert_eq!(completed.status, ActivityStatus::Completed);
    let completed_at = completed.completed_at.expect("completed_at should be set");

    let err = repo.skip_activity(activity.id).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::InvalidTransition {
            from: ActivityStatus::Completed,
            to: ActivityStatus::Skipped,
            ..
        }
    ));

    let reloaded = repo.find_activity_by_id(activity.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ActivityStatus::Completed);
    assert_eq!(reloaded.completed_at, Some(completed_at));
}

#[tokio::test]
async fn test_sun_failure_does_not_fail_timeline() {
    let (repo, _temp_dir) = setup_test_db().await;
    create_test_routine(&repo, "Run", mon_wed_fri(), date(2024, 1, 1)).await;
    create_test_routine(&repo, "Read", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;

    let sun = FailingSun;
    let assembler = TimelineAssembler::new(&repo, &sun, located_profile());
    let points = assembler.assemble(date(2024, 1, 3), StatusFilter::All).await.unwrap();

    assert_eq!(activity_entries(&points).len(), 2);
    assert_eq!(ambient_count(&points), 0);
}

#[tokio::test]
async fn test_missing_coordinates_leave_out_sun_entries() {
    let (repo, _temp_dir) = setup_test_db().await;
    create_test_routine(&repo, "Run", mon_wed_fri(), date(2024, 1, 1)).await;
    create_test_routine(&repo, "Read", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;

    let day = date(2024, 1, 3);
    // The source would answer, but there is no location to ask about
    let sun = FixedSun(sun_for(day));
    let profile = UserProfile {
        timezone: "UTC".to_string(),
        latitude: Some(52.52),
        longitude: None,
    };
    let assembler = TimelineAssembler::new(&repo, &sun, profile);
    let points = assembler.assemble(day, StatusFilter::All).await.unwrap();

    assert_eq!(activity_entries(&points).len(), 2);
    assert_eq!(ambient_count(&points), 0);

    let assembler = TimelineAssembler::new(&repo, &sun, UserProfile::default());
    let points = assembler.assemble(day, StatusFilter::All).await.unwrap();
    assert_eq!(activity_entries(&points).len(), 2);
    assert_eq!(ambient_count(&points), 0);
}

#[tokio::test]
async fn test_slow_sun_source_is_cut_off() {
    let (repo, _temp_dir) = setup_test_db().await;
    create_test_routine(&repo, "Read", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;

    let sun = SlowSun;
    let assembler = TimelineAssembler::new(&repo, &sun, located_profile()).with_config(TimelineConfig {
        sun_timeout: std::time::Duration::from_millis(50),
    });
    let points = assembler.assemble(date(2024, 1, 3), StatusFilter::All).await.unwrap();

    assert_eq!(activity_entries(&points).len(), 1);
    assert_eq!(ambient_count(&points), 0);
}

#[tokio::test]
async fn test_timeline_merges_sun_and_sorts_latest_first() {
    let (repo, _temp_dir) = setup_test_db().await;
    create_test_routine(&repo, "Run", mon_wed_fri(), date(2024, 1, 1)).await;
    let evening = repo
        .create_routine(NewRoutineData {
            name: "Journal".to_string(),
            icon: None,
            color: None,
            recurrence: Recurrence::Daily { every: 1 },
            start_date: date(2024, 1, 1),
            end_date: None,
            window: TimeWindow {
                from: time(16, 10),
                to: time(16, 30),
            },
        })
        .await
        .unwrap();

    let day = date(2024, 1, 3);
    let sun = FixedSun(sun_for(day));
    let assembler = TimelineAssembler::new(&repo, &sun, located_profile());
    let points = assembler.assemble(day, StatusFilter::All).await.unwrap();

    let stamps: Vec<_> = points.iter().map(|p| p.timestamp).collect();
    let mut sorted = stamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(stamps, sorted);

    // Journal starts exactly at sunset and shares its point, activity first
    let sunset_point = &points[0];
    assert_eq!(sunset_point.timestamp, sun_for(day).sunset);
    assert_eq!(sunset_point.entries.len(), 2);
    assert!(sunset_point.entries[0].activity_id.is_some());
    assert_eq!(sunset_point.entries[0].label, evening.name);
    assert_eq!(sunset_point.entries[1].kind, EntryKind::Sunset);

    assert_eq!(points.len(), 3);
    assert_eq!(points[2].entries[0].kind, EntryKind::Sunrise);
}

#[tokio::test]
async fn test_status_filter_keeps_ambient_entries() {
    let (repo, _temp_dir) = setup_test_db().await;
    create_test_routine(&repo, "Run", mon_wed_fri(), date(2024, 1, 1)).await;

    let day = date(2024, 1, 3);
    let sun = FixedSun(sun_for(day));
    let assembler = TimelineAssembler::new(&repo, &sun, located_profile());
    let points = assembler.assemble(day, StatusFilter::Completed).await.unwrap();

    assert!(activity_entries(&points).is_empty());
    assert_eq!(ambient_count(&points), 2);
}

#[tokio::test]
async fn test_repeated_reads_do_not_duplicate() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(&repo, "Run", mon_wed_fri(), date(2024, 1, 1)).await;

    let sun = FailingSun;
    let assembler = TimelineAssembler::new(&repo, &sun, UserProfile::default());
    let first = assembler.assemble(date(2024, 1, 5), StatusFilter::All).await.unwrap();
    let second = assembler.assemble(date(2024, 1, 5), StatusFilter::All).await.unwrap();

    assert_eq!(
        activity_entries(&first)[0].activity_id,
        activity_entries(&second)[0].activity_id
    );

    let again = repo
        .ensure_materialized(&routine, &[date(2024, 1, 5), date(2024, 1, 5)], &utc())
        .await
        .unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(Some(again[0].id), activity_entries(&first)[0].activity_id);

    let stored = repo
        .find_activities_for_routine(routine.id, date(2024, 1, 1), date(2024, 1, 31))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_concurrent_materialization_creates_one_activity() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(&repo, "Meditate", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;
    let repo = Arc::new(repo);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = Arc::clone(&repo);
        let routine = routine.clone();
        handles.push(tokio::spawn(async move {
            repo.ensure_materialized(&routine, &[date(2024, 2, 10)], &chrono_tz::UTC)
                .await
                .map(|activities| activities[0].id)
        }));
    }

    let mut ids = BTreeSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(ids.len(), 1);

    let stored = repo
        .find_activities_for_routine(routine.id, date(2024, 2, 10), date(2024, 2, 10))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_dates_outside_rule_bounds_are_not_materialized() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = repo
        .create_routine(NewRoutineData {
            name: "Course".to_string(),
            icon: None,
            color: None,
            recurrence: Recurrence::Daily { every: 1 },
            start_date: date(2024, 3, 1),
            end_date: Some(date(2024, 3, 10)),
            window: TimeWindow {
                from: time(18, 0),
                to: time(19, 0),
            },
        })
        .await
        .unwrap();

    let created = repo
        .ensure_materialized(
            &routine,
            &[date(2024, 2, 29), date(2024, 3, 1), date(2024, 3, 10), date(2024, 3, 11)],
            &utc(),
        )
        .await
        .unwrap();
    let dates: Vec<_> = created.iter().map(|a| a.occurrence_date).collect();
    assert_eq!(dates, vec![date(2024, 3, 1), date(2024, 3, 10)]);
}

#[tokio::test]
async fn test_lifecycle_errors() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(&repo, "Stretch", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;
    let activity = repo
        .ensure_materialized(&routine, &[date(2024, 1, 2)], &utc())
        .await
        .unwrap()
        .remove(0);

    let skipped = repo.skip_activity(activity.id).await.unwrap();
    assert_eq!(skipped.status, ActivityStatus::Skipped);
    assert!(skipped.completed_at.is_none());

    assert!(matches!(
        repo.complete_activity(activity.id).await,
        Err(CoreError::InvalidTransition { from: ActivityStatus::Skipped, .. })
    ));
    assert!(matches!(
        repo.skip_activity(activity.id).await,
        Err(CoreError::InvalidTransition { .. })
    ));
    assert!(matches!(
        repo.complete_activity(uuid::Uuid::now_v7()).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_filter_partitions_all() {
    let (repo, _temp_dir) = setup_test_db().await;
    let day = date(2024, 1, 3);
    let mut ids = Vec::new();
    for name in ["A", "B", "C", "D", "E"] {
        let routine = create_test_routine(&repo, name, Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;
        let activity = repo.ensure_materialized(&routine, &[day], &utc()).await.unwrap().remove(0);
        ids.push(activity.id);
    }
    repo.complete_activity(ids[0]).await.unwrap();
    repo.complete_activity(ids[1]).await.unwrap();
    repo.skip_activity(ids[2]).await.unwrap();

    let ids_for = |activities: Vec<Activity>| -> BTreeSet<uuid::Uuid> {
        activities.into_iter().map(|a| a.id).collect()
    };
    let all = ids_for(repo.list_by_date_and_status(day, StatusFilter::All).await.unwrap());
    let available = ids_for(repo.list_by_date_and_status(day, StatusFilter::Available).await.unwrap());
    let completed = ids_for(repo.list_by_date_and_status(day, StatusFilter::Completed).await.unwrap());
    let skipped = ids_for(repo.list_by_date_and_status(day, StatusFilter::Skipped).await.unwrap());

    assert_eq!((available.len(), completed.len(), skipped.len()), (2, 2, 1));
    assert!(available.is_disjoint(&completed));
    assert!(available.is_disjoint(&skipped));
    assert!(completed.is_disjoint(&skipped));

    let union: BTreeSet<_> = available.union(&completed).chain(skipped.iter()).copied().collect();
    assert_eq!(all, union);
}

#[tokio::test]
async fn test_routine_edit_and_delete_leave_history() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(&repo, "Run", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;
    let activity = repo
        .ensure_materialized(&routine, &[date(2024, 1, 2)], &utc())
        .await
        .unwrap()
        .remove(0);

    let updated = repo
        .update_routine(
            routine.id,
            UpdateRoutineData {
                name: Some("Long run".to_string()),
                window: Some(TimeWindow {
                    from: time(6, 0),
                    to: time(7, 30),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Long run");

    let old = repo.find_activity_by_id(activity.id).await.unwrap().unwrap();
    assert_eq!(old.name, "Run");
    assert_eq!(old.start_at, activity.start_at);

    let fresh = repo
        .ensure_materialized(&updated, &[date(2024, 1, 3)], &utc())
        .await
        .unwrap()
        .remove(0);
    assert_eq!(fresh.name, "Long run");
    assert_eq!(fresh.start_at, Utc.with_ymd_and_hms(2024, 1, 3, 6, 0, 0).unwrap());

    repo.delete_routine(routine.id).await.unwrap();
    assert!(repo.find_routine_by_id(routine.id).await.unwrap().is_none());
    assert!(repo.find_activity_by_id(activity.id).await.unwrap().is_some());
    assert!(matches!(
        repo.delete_routine(routine.id).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_invalid_routines_are_rejected() {
    let (repo, _temp_dir) = setup_test_db().await;

    let err = repo
        .create_routine(NewRoutineData {
            name: "Broken".to_string(),
            icon: None,
            color: None,
            recurrence: Recurrence::Weekly { days: WeekdaySet::new() },
            start_date: date(2024, 1, 1),
            end_date: None,
            window: TimeWindow {
                from: time(7, 0),
                to: time(8, 0),
            },
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidRule(_)));

    let routine = create_test_routine(&repo, "Run", mon_wed_fri(), date(2024, 1, 10)).await;
    let err = repo
        .update_routine(
            routine.id,
            UpdateRoutineData {
                end_date: Some(Some(date(2024, 1, 1))),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidRule(_)));
    assert!(repo.find_routines().await.unwrap().len() == 1);
}

#[tokio::test]
async fn test_paused_routines_stay_off_the_timeline() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(&repo, "Run", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;
    repo.update_routine(
        routine.id,
        UpdateRoutineData {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let sun = FailingSun;
    let assembler = TimelineAssembler::new(&repo, &sun, UserProfile::default());
    let points = assembler.assemble(date(2024, 1, 3), StatusFilter::All).await.unwrap();
    assert!(points.is_empty());
    assert!(repo.find_active_routines().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_backfill_sweep() {
    let (repo, _temp_dir) = setup_test_db().await;
    create_test_routine(&repo, "Read", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;
    create_test_routine(&repo, "Run", mon_wed_fri(), date(2024, 1, 1)).await;

    // Mon 2024-01-08 through Sun 2024-01-14
    let summary = repo.backfill(date(2024, 1, 8), date(2024, 1, 14), &utc()).await.unwrap();
    assert_eq!(summary.routines_processed, 2);
    assert_eq!(summary.activities_created, 7 + 3);
    assert_eq!(summary.routines_with_errors, 0);

    let rerun = repo.backfill(date(2024, 1, 8), date(2024, 1, 14), &utc()).await.unwrap();
    assert_eq!(rerun.activities_created, 0);
}

#[tokio::test]
async fn test_backfill_respects_batch_size() {
    let temp_dir = tempfile::tempdir().unwrap();
    let pool = establish_connection(&temp_dir.path().join("batch.db").to_string_lossy())
        .await
        .unwrap();
    let repo = SqliteRepository::new(
        pool,
        MaterializationManager::new(MaterializationConfig {
            max_batch_size: 3,
            ..Default::default()
        }),
    );
    create_test_routine(&repo, "Read", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;

    let summary = repo.backfill(date(2024, 1, 1), date(2024, 1, 31), &utc()).await.unwrap();
    assert_eq!(summary.activities_created, 3);
}

#[tokio::test]
async fn test_occurrence_times_follow_profile_timezone() {
    let (repo, _temp_dir) = setup_test_db().await;
    create_test_routine(&repo, "Run", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;

    let sun = FailingSun;
    let profile = UserProfile {
        timezone: "America/New_York".to_string(),
        ..Default::default()
    };
    let assembler = TimelineAssembler::new(&repo, &sun, profile);
    let points = assembler.assemble(date(2024, 7, 1), StatusFilter::All).await.unwrap();

    let entry = activity_entries(&points)[0];
    assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2024, 7, 1, 11, 0, 0).unwrap());
    assert_eq!(entry.end_at, Some(entry.timestamp + Duration::hours(1)));
}

#[tokio::test]
async fn test_bad_profile_timezone_is_an_error() {
    let (repo, _temp_dir) = setup_test_db().await;
    let sun = FailingSun;
    let profile = UserProfile {
        timezone: "Mars/Olympus".to_string(),
        ..Default::default()
    };
    let assembler = TimelineAssembler::new(&repo, &sun, profile);
    assert!(matches!(
        assembler.assemble(date(2024, 1, 1), StatusFilter::All).await,
        Err(CoreError::InvalidTimezone(_))
    ));
}

#[tokio::test]
async fn test_short_id_lookup() {
    let (repo, _temp_dir) = setup_test_db().await;
    let routine = create_test_routine(&repo, "Run", Recurrence::Daily { every: 1 }, date(2024, 1, 1)).await;
    let activity = repo
        .ensure_materialized(&routine, &[date(2024, 1, 1)], &utc())
        .await
        .unwrap()
        .remove(0);

    let full = routine.id.simple().to_string();
    let found = repo.find_routines_by_short_id_prefix(&full[..12]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, routine.id);

    let full = activity.id.simple().to_string().to_uppercase();
    let found = repo.find_activities_by_short_id_prefix(&full[..12]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, activity.id);

    assert!(repo.find_routines_by_short_id_prefix("xyz").await.unwrap().is_empty());
}

#[test]
fn test_preview_matches_calculator() {
    let rule = RecurrenceRule {
        recurrence: mon_wed_fri(),
        start_date: date(2024, 1, 1),
        end_date: None,
    };
    let preview = preview_occurrences(&rule, date(2024, 1, 1), 6).unwrap();
    let window = candidate_dates(&rule, date(2024, 1, 1), date(2024, 1, 12)).unwrap();
    assert_eq!(preview, window);
}
