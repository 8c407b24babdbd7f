use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::{HistoryTrip, MonthSummary, TripEndpoint, TripScores},
};

use super::details::{insert_details, load_details, DetailTable};

const MONTH_COLUMNS: &str = "month_key, total_trips, total_distance_miles, total_duration_minutes,
    highest_speed, acceleration_score, deceleration_score, smoothness_score, updated_at";

const HISTORY_TRIP_COLUMNS: &str = "id, month_key,
    origination_time, origination_latitude, origination_longitude, origination_address,
    destination_time, destination_latitude, destination_longitude, destination_address,
    max_speed, duration_minutes, distance_miles,
    acceleration_score, deceleration_score, smoothness_score";

fn row_to_month(row: &Row) -> Result<MonthSummary> {
    let updated_at: String = row.get("updated_at")?;

    Ok(MonthSummary {
        month_key: row.get("month_key")?,
        total_trips: row.get("total_trips")?,
        total_distance_miles: row.get("total_distance_miles")?,
        total_duration_minutes: row.get("total_duration_minutes")?,
        highest_speed: row.get("highest_speed")?,
        scores: TripScores {
            acceleration: row.get("acceleration_score")?,
            deceleration: row.get("deceleration_score")?,
            smoothness: row.get("smoothness_score")?,
        },
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        trips: Vec::new(),
    })
}

fn row_to_history_trip(row: &Row) -> Result<HistoryTrip> {
    let origination_time: String = row.get("origination_time")?;
    let destination_time: String = row.get("destination_time")?;

    Ok(HistoryTrip {
        id: row.get("id")?,
        month_key: row.get("month_key")?,
        origination: TripEndpoint {
            timestamp: parse_datetime(&origination_time, "origination_time")?,
            latitude: row.get("origination_latitude")?,
            longitude: row.get("origination_longitude")?,
            address: row.get("origination_address")?,
        },
        destination: TripEndpoint {
            timestamp: parse_datetime(&destination_time, "destination_time")?,
            latitude: row.get("destination_latitude")?,
            longitude: row.get("destination_longitude")?,
            address: row.get("destination_address")?,
        },
        max_speed: row.get("max_speed")?,
        duration_minutes: row.get("duration_minutes")?,
        distance_miles: row.get("distance_miles")?,
        scores: TripScores {
            acceleration: row.get("acceleration_score")?,
            deceleration: row.get("deceleration_score")?,
            smoothness: row.get("smoothness_score")?,
        },
        details: Vec::new(),
    })
}

pub(crate) fn month_exists(conn: &Connection, month_key: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM month_summaries WHERE month_key = ?1",
            params![month_key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn insert_month(conn: &Connection, month: &MonthSummary) -> Result<()> {
    conn.execute(
        "INSERT INTO month_summaries (
            month_key, total_trips, total_distance_miles, total_duration_minutes,
            highest_speed, acceleration_score, deceleration_score, smoothness_score, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            month.month_key,
            month.total_trips,
            month.total_distance_miles,
            month.total_duration_minutes,
            month.highest_speed,
            month.scores.acceleration,
            month.scores.deceleration,
            month.scores.smoothness,
            format_datetime(&month.updated_at),
        ],
    )
    .with_context(|| format!("failed to insert month summary {}", month.month_key))?;
    Ok(())
}

/// Overwrite the aggregate columns of an existing month.
pub(crate) fn update_month_totals(conn: &Connection, month: &MonthSummary) -> Result<()> {
    conn.execute(
        "UPDATE month_summaries
         SET total_trips = ?1,
             total_distance_miles = ?2,
             total_duration_minutes = ?3,
             highest_speed = ?4,
             acceleration_score = ?5,
             deceleration_score = ?6,
             smoothness_score = ?7,
             updated_at = ?8
         WHERE month_key = ?9",
        params![
            month.total_trips,
            month.total_distance_miles,
            month.total_duration_minutes,
            month.highest_speed,
            month.scores.acceleration,
            month.scores.deceleration,
            month.scores.smoothness,
            format_datetime(&month.updated_at),
            month.month_key,
        ],
    )
    .with_context(|| format!("failed to update month summary {}", month.month_key))?;
    Ok(())
}

pub(crate) fn delete_month(conn: &Connection, month_key: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM month_summaries WHERE month_key = ?1",
        params![month_key],
    )
    .with_context(|| format!("failed to delete month summary {month_key}"))
}

pub(crate) fn history_trip_filed(
    conn: &Connection,
    month_key: &str,
    origination: &DateTime<Utc>,
) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM history_trips WHERE month_key = ?1 AND origination_time = ?2",
            params![month_key, format_datetime(origination)],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn insert_history_trip(conn: &Connection, trip: &HistoryTrip) -> Result<()> {
    conn.execute(
        "INSERT INTO history_trips (
            id, month_key,
            origination_time, origination_latitude, origination_longitude, origination_address,
            destination_time, destination_latitude, destination_longitude, destination_address,
            max_speed, duration_minutes, distance_miles,
            acceleration_score, deceleration_score, smoothness_score
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            trip.id,
            trip.month_key,
            format_datetime(&trip.origination.timestamp),
            trip.origination.latitude,
            trip.origination.longitude,
            trip.origination.address,
            format_datetime(&trip.destination.timestamp),
            trip.destination.latitude,
            trip.destination.longitude,
            trip.destination.address,
            trip.max_speed,
            trip.duration_minutes,
            trip.distance_miles,
            trip.scores.acceleration,
            trip.scores.deceleration,
            trip.scores.smoothness,
        ],
    )
    .with_context(|| format!("failed to insert history trip {}", trip.id))?;

    insert_details(conn, DetailTable::History, &trip.id, &trip.details)
}

/// Headers of every history trip filed under `month_key`, oldest first.
pub(crate) fn load_history_trips(conn: &Connection, month_key: &str) -> Result<Vec<HistoryTrip>> {
    let sql = format!(
        "SELECT {HISTORY_TRIP_COLUMNS} FROM history_trips
         WHERE month_key = ?1
         ORDER BY origination_time ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![month_key])?;
    let mut trips = Vec::new();
    while let Some(row) = rows.next()? {
        trips.push(row_to_history_trip(row)?);
    }
    Ok(trips)
}

pub(crate) fn find_history_trip(
    conn: &Connection,
    origination: &DateTime<Utc>,
) -> Result<Option<HistoryTrip>> {
    let sql = format!(
        "SELECT {HISTORY_TRIP_COLUMNS} FROM history_trips
         WHERE origination_time = ?1
         ORDER BY id LIMIT 1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![format_datetime(origination)])?;
    let mut trip = match rows.next()? {
        Some(row) => row_to_history_trip(row)?,
        None => return Ok(None),
    };
    trip.details = load_details(conn, DetailTable::History, &trip.id)?;
    Ok(Some(trip))
}

pub(crate) fn delete_history_trip(conn: &Connection, history_trip_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM history_trips WHERE id = ?1",
        params![history_trip_id],
    )
    .with_context(|| format!("failed to delete history trip {history_trip_id}"))
}

pub(crate) fn load_month(conn: &Connection, month_key: &str) -> Result<Option<MonthSummary>> {
    let sql = format!("SELECT {MONTH_COLUMNS} FROM month_summaries WHERE month_key = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![month_key])?;
    let mut month = match rows.next()? {
        Some(row) => row_to_month(row)?,
        None => return Ok(None),
    };

    let mut trips = load_history_trips(conn, month_key)?;
    for trip in &mut trips {
        trip.details = load_details(conn, DetailTable::History, &trip.id)?;
    }
    month.trips = trips;
    Ok(Some(month))
}

impl Database {
    /// Month aggregate with every owned trip and its details.
    pub async fn get_month_summary(&self, month_key: &str) -> Result<Option<MonthSummary>> {
        let month_key = month_key.to_string();
        self.execute(move |conn| load_month(conn, &month_key)).await
    }

    /// Month headers (no trips), newest month first.
    pub async fn list_month_summaries(&self) -> Result<Vec<MonthSummary>> {
        self.execute(|conn| {
            let sql = format!("SELECT {MONTH_COLUMNS} FROM month_summaries ORDER BY month_key DESC");
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let mut months = Vec::new();
            while let Some(row) = rows.next()? {
                months.push(row_to_month(row)?);
            }
            Ok(months)
        })
        .await
    }

    pub async fn get_history_trip(&self, origination: DateTime<Utc>) -> Result<Option<HistoryTrip>> {
        self.execute(move |conn| find_history_trip(conn, &origination)).await
    }
}
