mod common;

use std::sync::Arc;

use chrono::Duration;
use common::*;
use drivelog_lib::{
    journal::dedup_journal, retention::deprocess_journal, EngineError, NoMapRenderer,
    SegmentationConfig, TripProcessor,
};

#[tokio::test]
async fn test_pass_splits_journal_on_gaps() {
    let (_dir, db) = open_db();
    let start = base_time();
    let samples: Vec<_> = [0, 5, 10, 605, 610]
        .iter()
        .enumerate()
        .map(|(index, &secs)| sample_at(start, secs, index, 8.0))
        .collect();
    db.insert_raw_samples(&samples).await.unwrap();

    let report = processor(&db).run_pass(&config(2)).await.unwrap();
    assert_eq!(report.samples_scanned, 5);
    assert_eq!(report.samples_consumed, 5);
    assert_eq!(report.trips_created, 2);
    assert_eq!(db.count_unprocessed_samples().await.unwrap(), 0);

    let first = db.get_trip(start).await.unwrap().unwrap();
    assert_eq!(first.details.len(), 3);
    assert_eq!(first.destination.timestamp, start + Duration::seconds(10));

    let second = db
        .get_trip(start + Duration::seconds(605))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.details.len(), 2);
    assert!(second.addresses_resolved);
    assert!(!second.origination.address.is_empty());
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let (_dir, db) = open_db();
    seed_trips(&db, 3).await;

    let report = processor(&db).run_pass(&config(2)).await.unwrap();
    assert_eq!(report.samples_consumed, 0);
    assert_eq!(report.trips_created, 0);
    assert_eq!(db.count_trips().await.unwrap(), 3);
}

#[tokio::test]
async fn test_short_groups_are_consumed_without_trips() {
    let (_dir, db) = open_db();
    seed_drives(&db, base_time(), 2, 3).await;

    let report = processor(&db).run_pass(&config(4)).await.unwrap();
    assert_eq!(report.trips_created, 0);
    assert_eq!(report.groups_discarded, 2);
    assert_eq!(db.count_unprocessed_samples().await.unwrap(), 0);
    assert_eq!(db.count_trips().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_config_touches_nothing() {
    let (_dir, db) = open_db();
    seed_drives(&db, base_time(), 1, 3).await;

    let err = processor(&db)
        .run_pass(&SegmentationConfig {
            trip_separator_secs: -1,
            ..config(2)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
    assert_eq!(db.count_unprocessed_samples().await.unwrap(), 3);
}

#[tokio::test]
async fn test_deprocess_rebuilds_in_place() {
    let (_dir, db) = open_db();
    let originations = seed_trips(&db, 2).await;
    let before = db.get_trip(originations[0]).await.unwrap().unwrap();

    let reset = deprocess_journal(&db).await.unwrap();
    assert_eq!(reset.affected, 6);

    let report = processor(&db).run_pass(&config(2)).await.unwrap();
    assert_eq!(report.trips_created, 2);
    assert_eq!(report.trips_replaced, 2);
    assert_eq!(db.count_trips().await.unwrap(), 2);

    let after = db.get_trip(originations[0]).await.unwrap().unwrap();
    assert_ne!(after.id, before.id);
    assert_eq!(after.details.len(), before.details.len());
}

#[tokio::test]
async fn test_forced_pass_regroups_processed_samples() {
    let (_dir, db) = open_db();
    seed_trips(&db, 2).await;

    let report = processor(&db)
        .run_pass(&SegmentationConfig {
            force_reprocessing: true,
            ..config(2)
        })
        .await
        .unwrap();
    assert_eq!(report.trips_replaced, 2);
    assert_eq!(db.count_trips().await.unwrap(), 2);
}

#[tokio::test]
async fn test_geocoder_outage_stores_trip_for_retry() {
    let (_dir, db) = open_db();
    let originations = seed_drives(&db, base_time(), 1, 3).await;

    let offline = TripProcessor::new(
        db.clone(),
        Arc::new(UnreachableGeocoder),
        Arc::new(NoMapRenderer),
    );
    let report = offline.run_pass(&config(2)).await.unwrap();
    assert_eq!(report.trips_created, 1);
    assert_eq!(report.unresolved_addresses, 1);

    let stored = db.get_trip(originations[0]).await.unwrap().unwrap();
    assert!(!stored.addresses_resolved);
    assert!(stored.origination.address.is_empty());

    assert_eq!(offline.resolve_pending_addresses().await.unwrap(), 0);
    assert_eq!(processor(&db).resolve_pending_addresses().await.unwrap(), 1);

    let resolved = db.get_trip(originations[0]).await.unwrap().unwrap();
    assert!(resolved.addresses_resolved);
    assert!(!resolved.destination.address.is_empty());
}

#[tokio::test]
async fn test_dedup_against_database_is_idempotent() {
    let (_dir, db) = open_db();
    let start = base_time();
    let original = sample_at(start, 0, 0, 5.0);
    let mut other_longitude = original.clone();
    other_longitude.longitude = -80.0;
    db.insert_raw_samples(&[
        original.clone(),
        sample_at(start, 10, 1, 5.0),
        original,
        other_longitude,
    ])
    .await
    .unwrap();

    let first = dedup_journal(&db).await.unwrap();
    assert_eq!(first.samples_examined, 4);
    assert_eq!(first.duplicates_removed, 2);

    let second = dedup_journal(&db).await.unwrap();
    assert_eq!(second.duplicates_removed, 0);
    assert_eq!(db.count_raw_samples().await.unwrap(), 2);

    let survivors = db.get_raw_samples_by_insertion().await.unwrap();
    assert_eq!(survivors[0].longitude, -84.51);
}

#[tokio::test]
async fn test_failed_commit_leaves_journal_untouched() {
    let (dir, db) = open_db();
    seed_drives(&db, base_time(), 2, 3).await;
    run_sql(
        &dir,
        "CREATE TRIGGER fail_third_detail BEFORE INSERT ON trip_details
         WHEN (SELECT COUNT(*) FROM trip_details) >= 2
         BEGIN SELECT RAISE(ABORT, 'detail insert refused'); END;",
    );

    let err = processor(&db).run_pass(&config(2)).await.unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));
    assert!(err.to_string().contains("detail insert refused"));
    assert_eq!(db.count_unprocessed_samples().await.unwrap(), 6);
    assert_eq!(db.count_trips().await.unwrap(), 0);

    run_sql(&dir, "DROP TRIGGER fail_third_detail;");
    let report = processor(&db).run_pass(&config(2)).await.unwrap();
    assert_eq!(report.trips_created, 2);
    assert_eq!(db.count_unprocessed_samples().await.unwrap(), 0);
}

#[tokio::test]
async fn test_wider_separator_replaces_every_overlapped_trip() {
    let (_dir, db) = open_db();
    let start = base_time();
    let samples: Vec<_> = [0, 5, 10, 605, 610]
        .iter()
        .enumerate()
        .map(|(index, &secs)| sample_at(start, secs, index, 8.0))
        .collect();
    db.insert_raw_samples(&samples).await.unwrap();
    assert_eq!(processor(&db).run_pass(&config(2)).await.unwrap().trips_created, 2);

    let report = processor(&db)
        .run_pass(&SegmentationConfig {
            trip_separator_secs: 1000,
            force_reprocessing: true,
            ..config(2)
        })
        .await
        .unwrap();
    assert_eq!(report.trips_created, 1);
    assert_eq!(report.trips_replaced, 2);

    let stored = db.list_trips().await.unwrap();
    assert_eq!(stored.len(), 1);
    let merged = db.get_trip(start).await.unwrap().unwrap();
    assert_eq!(merged.details.len(), 5);
    assert!(db
        .get_trip(start + Duration::seconds(605))
        .await
        .unwrap()
        .is_none());
}
