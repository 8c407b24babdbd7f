mod common;

use chrono::{Duration, TimeZone, Utc};
use common::*;
use drivelog_lib::{
    history::{delete_history_trip, rollup, rollup_pending, RollupOutcome},
    retention::purge_trips_by_count,
    EngineError,
};

#[tokio::test]
async fn test_rollup_creates_month_from_first_trip() {
    let (_dir, db) = open_db();
    let originations = seed_trips(&db, 1).await;
    let trip = db.get_trip(originations[0]).await.unwrap().unwrap();

    let outcome = rollup(&db, originations[0]).await.unwrap();
    assert_eq!(
        outcome,
        RollupOutcome::Filed {
            month_key: "2024-03".into()
        }
    );

    let month = db.get_month_summary("2024-03").await.unwrap().unwrap();
    assert_eq!(month.total_trips, 1);
    assert_eq!(month.trips.len(), 1);
    assert_eq!(month.total_duration_minutes, trip.duration_minutes);
    assert!((month.total_distance_miles - trip.distance_miles).abs() < 1e-9);
    assert_eq!(month.highest_speed, trip.max_speed);
    assert_eq!(month.trips[0].details.len(), trip.details.len());
    assert_ne!(month.trips[0].id, trip.id);

    assert!(db.get_trip(originations[0]).await.unwrap().unwrap().archived);
}

#[tokio::test]
async fn test_second_rollup_is_skipped() {
    let (_dir, db) = open_db();
    let originations = seed_trips(&db, 1).await;

    rollup(&db, originations[0]).await.unwrap();
    let again = rollup(&db, originations[0]).await.unwrap();
    assert!(matches!(again, RollupOutcome::AlreadyFiled { .. }));

    let month = db.get_month_summary("2024-03").await.unwrap().unwrap();
    assert_eq!(month.total_trips, 1);
    assert_eq!(month.trips.len(), 1);
}

#[tokio::test]
async fn test_month_totals_track_owned_trips() {
    let (_dir, db) = open_db();
    let originations = seed_trips(&db, 3).await;

    for origination in &originations {
        rollup(&db, *origination).await.unwrap();
    }

    let month = db.get_month_summary("2024-03").await.unwrap().unwrap();
    let distance: f64 = month.trips.iter().map(|trip| trip.distance_miles).sum();
    assert_eq!(month.total_trips, 3);
    assert_eq!(month.total_trips as usize, month.trips.len());
    assert!((month.total_distance_miles - distance).abs() < 1e-9);

    delete_history_trip(&db, originations[1]).await.unwrap();
    let month = db.get_month_summary("2024-03").await.unwrap().unwrap();
    let distance: f64 = month.trips.iter().map(|trip| trip.distance_miles).sum();
    assert_eq!(month.total_trips, 2);
    assert_eq!(month.trips.len(), 2);
    assert!((month.total_distance_miles - distance).abs() < 1e-9);
}

#[tokio::test]
async fn test_deleting_last_history_trip_removes_month() {
    let (_dir, db) = open_db();
    let originations = seed_trips(&db, 1).await;
    rollup(&db, originations[0]).await.unwrap();

    delete_history_trip(&db, originations[0]).await.unwrap();
    assert!(db.get_month_summary("2024-03").await.unwrap().is_none());
    assert!(db.list_month_summaries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_timestamps_are_not_found() {
    let (_dir, db) = open_db();
    let originations = seed_trips(&db, 1).await;
    let unknown = originations[0] + Duration::minutes(1);

    let err = rollup(&db, unknown).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
    assert!(db.list_month_summaries().await.unwrap().is_empty());

    rollup(&db, originations[0]).await.unwrap();
    let err = delete_history_trip(&db, unknown).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        db.get_month_summary("2024-03")
            .await
            .unwrap()
            .unwrap()
            .total_trips,
        1
    );
}

#[tokio::test]
async fn test_history_survives_trip_purge() {
    let (_dir, db) = open_db();
    let originations = seed_trips(&db, 2).await;
    rollup(&db, originations[0]).await.unwrap();

    purge_trips_by_count(&db, 0).await.unwrap();
    assert_eq!(db.count_trips().await.unwrap(), 0);

    let filed = db.get_history_trip(originations[0]).await.unwrap().unwrap();
    assert_eq!(filed.details.len(), 3);
}

#[tokio::test]
async fn test_rollup_pending_files_across_months() {
    let (_dir, db) = open_db();
    let february = Utc.with_ymd_and_hms(2024, 2, 29, 22, 0, 0).unwrap();
    seed_drives(&db, february, 3, 3).await;
    processor(&db).run_pass(&config(2)).await.unwrap();

    let report = rollup_pending(&db).await.unwrap();
    assert_eq!(report.trips_filed, 3);
    assert_eq!(report.months_touched, vec!["2024-02", "2024-03"]);

    let months = db.list_month_summaries().await.unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(months[0].month_key, "2024-03");
    assert_eq!(months[0].total_trips, 1);
    assert_eq!(months[1].total_trips, 2);

    let again = rollup_pending(&db).await.unwrap();
    assert_eq!(again.trips_filed, 0);
    assert_eq!(again.trips_skipped, 0);
}

#[tokio::test]
async fn test_rebuilt_trip_keeps_archived_flag() {
    let (_dir, db) = open_db();
    let originations = seed_trips(&db, 1).await;
    rollup(&db, originations[0]).await.unwrap();

    drivelog_lib::retention::deprocess_journal(&db).await.unwrap();
    processor(&db).run_pass(&config(2)).await.unwrap();

    let rebuilt = db.get_trip(originations[0]).await.unwrap().unwrap();
    assert!(rebuilt.archived);
    assert_eq!(rollup_pending(&db).await.unwrap().trips_filed, 0);
}

#[tokio::test]
async fn test_merged_rebuild_is_not_treated_as_filed() {
    let (_dir, db) = open_db();
    let start = base_time();
    let samples: Vec<_> = [0, 5, 10, 605, 610]
        .iter()
        .enumerate()
        .map(|(index, &secs)| sample_at(start, secs, index, 8.0))
        .collect();
    db.insert_raw_samples(&samples).await.unwrap();
    processor(&db).run_pass(&config(2)).await.unwrap();
    assert_eq!(rollup_pending(&db).await.unwrap().trips_filed, 2);

    processor(&db)
        .run_pass(&drivelog_lib::SegmentationConfig {
            trip_separator_secs: 1000,
            force_reprocessing: true,
            ..config(2)
        })
        .await
        .unwrap();

    let trips = db.list_trips().await.unwrap();
    assert_eq!(trips.len(), 1);
    assert!(!trips[0].archived);

    // The merged trip starts where a filed one did, so the month is left as is.
    let report = rollup_pending(&db).await.unwrap();
    assert_eq!(report.trips_skipped, 1);
    assert!(db.get_trip(start).await.unwrap().unwrap().archived);
    let month = db.get_month_summary("2024-03").await.unwrap().unwrap();
    assert_eq!(month.total_trips as usize, month.trips.len());
}
