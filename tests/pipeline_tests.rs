mod common;

use common::*;
use drivelog_lib::{process_all, TripSettings};

#[tokio::test]
async fn test_full_pass_runs_every_stage() {
    let (_dir, db) = open_db();
    seed_drives(&db, base_time(), 4, 3).await;
    // A replayed fix that dedup should drop.
    db.insert_raw_sample(&sample_at(base_time(), 0, 0, 12.0))
        .await
        .unwrap();

    let settings = TripSettings {
        min_entries_per_trip: 2,
        trip_count_retention_limit: 2,
        gps_trip_count_retention_limit: 1,
        ..Default::default()
    };
    let report = process_all(&db, &processor(&db), &settings).await.unwrap();

    assert_eq!(report.dedup.duplicates_removed, 1);
    assert_eq!(report.segmentation.trips_created, 4);
    assert_eq!(report.rollup.trips_filed, 4);
    assert_eq!(report.rollup.months_touched, vec!["2024-03"]);
    assert_eq!(report.retention.trips_purged, 2);
    assert_eq!(report.retention.samples_purged, 9);
    assert_eq!(report.message().lines().count(), 4);

    assert_eq!(db.count_trips().await.unwrap(), 2);
    assert_eq!(db.count_raw_samples().await.unwrap(), 3);
    let month = db.get_month_summary("2024-03").await.unwrap().unwrap();
    assert_eq!(month.total_trips, 4);
}

#[tokio::test]
async fn test_full_pass_rejects_invalid_settings_before_any_stage() {
    let (_dir, db) = open_db();
    seed_drives(&db, base_time(), 1, 3).await;
    db.insert_raw_sample(&sample_at(base_time(), 0, 0, 12.0))
        .await
        .unwrap();

    let settings = TripSettings {
        min_entries_per_trip: 0,
        ..Default::default()
    };
    assert!(process_all(&db, &processor(&db), &settings).await.is_err());
    assert_eq!(db.count_raw_samples().await.unwrap(), 4);
    assert_eq!(db.count_trips().await.unwrap(), 0);
}
