#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use drivelog_lib::{
    db::RawSample, CoordinateGeocoder, Database, EngineError, EngineResult, Geocoder,
    NoMapRenderer, SegmentationConfig, TripProcessor,
};
use tempfile::TempDir;

const DB_FILE: &str = "drivelog.sqlite3";

/// Keep the `TempDir` alive for as long as the database is used.
pub fn open_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db = Database::new(dir.path().join(DB_FILE)).unwrap();
    (dir, db)
}

/// Run raw SQL against the database file from a second connection, e.g. to
/// install a trigger that makes a later statement fail.
pub fn run_sql(dir: &TempDir, sql: &str) {
    let conn = rusqlite::Connection::open(dir.path().join(DB_FILE)).unwrap();
    conn.execute_batch(sql).unwrap();
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap()
}

pub fn config(min_entries: usize) -> SegmentationConfig {
    SegmentationConfig {
        trip_separator_secs: 300,
        min_entries_per_trip: min_entries,
        force_reprocessing: false,
    }
}

pub fn sample_at(start: DateTime<Utc>, offset_secs: i64, index: usize, speed: f64) -> RawSample {
    RawSample::new(
        start + Duration::seconds(offset_secs),
        39.10 + index as f64 * 0.001,
        -84.51,
        speed,
    )
}

/// `trips` drives of `per_trip` fixes 10 s apart, one drive per hour.
/// Returns the origination of each drive.
pub async fn seed_drives(
    db: &Database,
    start: DateTime<Utc>,
    trips: usize,
    per_trip: usize,
) -> Vec<DateTime<Utc>> {
    let mut samples = Vec::new();
    let mut originations = Vec::new();
    for trip in 0..trips {
        let trip_start = start + Duration::hours(trip as i64);
        originations.push(trip_start);
        for index in 0..per_trip {
            samples.push(sample_at(trip_start, index as i64 * 10, index, 12.0));
        }
    }
    db.insert_raw_samples(&samples).await.unwrap();
    originations
}

pub fn processor(db: &Database) -> TripProcessor {
    TripProcessor::new(
        db.clone(),
        Arc::new(CoordinateGeocoder),
        Arc::new(NoMapRenderer),
    )
}

/// Geocoder whose backend is always down.
pub struct UnreachableGeocoder;

#[async_trait]
impl Geocoder for UnreachableGeocoder {
    async fn resolve_address(&self, _latitude: f64, _longitude: f64) -> EngineResult<String> {
        Err(EngineError::CollaboratorUnavailable("geocoder offline".into()))
    }
}

/// Seed drives and segment them into stored trips.
pub async fn seed_trips(db: &Database, trips: usize) -> Vec<DateTime<Utc>> {
    let originations = seed_drives(db, base_time(), trips, 3).await;
    let report = processor(db).run_pass(&config(2)).await.unwrap();
    assert_eq!(report.trips_created, trips);
    originations
}
