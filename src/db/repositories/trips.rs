use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::{MapRegion, TripEndpoint, TripScores, TripSummary},
};

use super::details::{insert_details, load_details, DetailTable};

const TRIP_COLUMNS: &str = "id,
    origination_time, origination_latitude, origination_longitude, origination_address,
    destination_time, destination_latitude, destination_longitude, destination_address,
    max_speed, duration_minutes, distance_miles,
    acceleration_score, deceleration_score, smoothness_score,
    region_center_latitude, region_center_longitude, region_latitude_span, region_longitude_span,
    archived, addresses_resolved, map_image";

/// Header only; `details` is left empty.
fn row_to_trip(row: &Row) -> Result<TripSummary> {
    let origination_time: String = row.get("origination_time")?;
    let destination_time: String = row.get("destination_time")?;

    Ok(TripSummary {
        id: row.get("id")?,
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
        region: MapRegion {
            center_latitude: row.get("region_center_latitude")?,
            center_longitude: row.get("region_center_longitude")?,
            latitude_span: row.get("region_latitude_span")?,
            longitude_span: row.get("region_longitude_span")?,
        },
        archived: row.get::<_, i64>("archived")? != 0,
        addresses_resolved: row.get::<_, i64>("addresses_resolved")? != 0,
        map_image: row.get("map_image")?,
        details: Vec::new(),
    })
}

fn query_trips(conn: &Connection, filter: &str, order_by: &str) -> Result<Vec<TripSummary>> {
    let sql = format!("SELECT {TRIP_COLUMNS} FROM trips {filter} ORDER BY {order_by}");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut trips = Vec::new();
    while let Some(row) = rows.next()? {
        trips.push(row_to_trip(row)?);
    }
    Ok(trips)
}

/// Insert a trip and its detail copies.
pub(crate) fn insert_trip(conn: &Connection, trip: &TripSummary) -> Result<()> {
    conn.execute(
        "INSERT INTO trips (
            id,
            origination_time, origination_latitude, origination_longitude, origination_address,
            destination_time, destination_latitude, destination_longitude, destination_address,
            max_speed, duration_minutes, distance_miles,
            acceleration_score, deceleration_score, smoothness_score,
            region_center_latitude, region_center_longitude, region_latitude_span, region_longitude_span,
            archived, addresses_resolved, map_image
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        params![
            trip.id,
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
            trip.region.center_latitude,
            trip.region.center_longitude,
            trip.region.latitude_span,
            trip.region.longitude_span,
            trip.archived,
            trip.addresses_resolved,
            trip.map_image,
        ],
    )
    .with_context(|| format!("failed to insert trip {}", trip.id))?;

    insert_details(conn, DetailTable::Trip, &trip.id, &trip.details)
}

/// Headers of stored trips whose time range intersects `[from, to]`.
pub(crate) fn load_overlapping_trips(
    conn: &Connection,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<Vec<TripSummary>> {
    let sql = format!(
        "SELECT {TRIP_COLUMNS} FROM trips
         WHERE origination_time <= ?2 AND destination_time >= ?1
         ORDER BY origination_time ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![format_datetime(from), format_datetime(to)])?;
    let mut trips = Vec::new();
    while let Some(row) = rows.next()? {
        trips.push(row_to_trip(row)?);
    }
    Ok(trips)
}

/// Full trip, details included.
pub(crate) fn load_trip(conn: &Connection, origination: &DateTime<Utc>) -> Result<Option<TripSummary>> {
    let sql = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE origination_time = ?1 ORDER BY id LIMIT 1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![format_datetime(origination)])?;
    let mut trip = match rows.next()? {
        Some(row) => row_to_trip(row)?,
        None => return Ok(None),
    };
    trip.details = load_details(conn, DetailTable::Trip, &trip.id)?;
    Ok(Some(trip))
}

/// All trip headers, newest origination first.
pub(crate) fn load_trips_newest_first(conn: &Connection) -> Result<Vec<TripSummary>> {
    query_trips(conn, "", "origination_time DESC, id ASC").context("failed to load trips")
}

pub(crate) fn load_unarchived_oldest_first(conn: &Connection) -> Result<Vec<TripSummary>> {
    query_trips(conn, "WHERE archived = 0", "origination_time ASC, id ASC")
        .context("failed to load unarchived trips")
}

pub(crate) fn load_unresolved_trips(conn: &Connection) -> Result<Vec<TripSummary>> {
    query_trips(conn, "WHERE addresses_resolved = 0", "origination_time ASC, id ASC")
        .context("failed to load trips with unresolved addresses")
}

/// Deletes the trip row; its details go with it through the cascade.
pub(crate) fn delete_trip(conn: &Connection, trip_id: &str) -> Result<usize> {
    conn.execute("DELETE FROM trips WHERE id = ?1", params![trip_id])
        .with_context(|| format!("failed to delete trip {trip_id}"))
}

pub(crate) fn delete_trips_by_origination(conn: &Connection, origination: &DateTime<Utc>) -> Result<usize> {
    conn.execute(
        "DELETE FROM trips WHERE origination_time = ?1",
        params![format_datetime(origination)],
    )
    .context("failed to delete trips by origination")
}

pub(crate) fn mark_archived(conn: &Connection, trip_id: &str) -> Result<()> {
    conn.execute("UPDATE trips SET archived = 1 WHERE id = ?1", params![trip_id])
        .with_context(|| format!("failed to archive trip {trip_id}"))?;
    Ok(())
}

pub(crate) fn update_addresses(
    conn: &Connection,
    trip_id: &str,
    origination_address: &str,
    destination_address: &str,
    resolved: bool,
) -> Result<()> {
    conn.execute(
        "UPDATE trips
         SET origination_address = ?1,
             destination_address = ?2,
             addresses_resolved = ?3
         WHERE id = ?4",
        params![origination_address, destination_address, resolved, trip_id],
    )
    .with_context(|| format!("failed to update addresses of trip {trip_id}"))?;
    Ok(())
}

impl Database {
    /// Trip headers (no details), newest first.
    pub async fn list_trips(&self) -> Result<Vec<TripSummary>> {
        self.execute(|conn| load_trips_newest_first(conn)).await
    }

    /// Trip with its detail records, looked up by origination timestamp.
    pub async fn get_trip(&self, origination: DateTime<Utc>) -> Result<Option<TripSummary>> {
        self.execute(move |conn| load_trip(conn, &origination)).await
    }

    pub async fn count_trips(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM trips", [], |row| row.get(0))?;
            crate::db::helpers::to_usize(count, "trip count")
        })
        .await
    }
}
