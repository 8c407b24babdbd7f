use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::RawSample,
};

const SAMPLE_COLUMNS: &str = "id, timestamp, latitude, longitude, speed, processed, code, note";

fn row_to_sample(row: &Row) -> Result<RawSample> {
    let timestamp: String = row.get("timestamp")?;

    Ok(RawSample {
        id: row.get("id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        speed: row.get("speed")?,
        processed: row.get::<_, i64>("processed")? != 0,
        code: row.get("code")?,
        note: row.get("note")?,
    })
}

fn query_samples(conn: &Connection, order_by: &str) -> Result<Vec<RawSample>> {
    let sql = format!("SELECT {SAMPLE_COLUMNS} FROM raw_samples ORDER BY {order_by}");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut samples = Vec::new();
    while let Some(row) = rows.next()? {
        samples.push(row_to_sample(row)?);
    }
    Ok(samples)
}

/// Whole journal, oldest fix first. Ties keep insertion order.
pub(crate) fn load_samples_by_time(conn: &Connection) -> Result<Vec<RawSample>> {
    query_samples(conn, "timestamp ASC, id ASC").context("failed to load raw samples by time")
}

pub(crate) fn load_samples_by_insertion(conn: &Connection) -> Result<Vec<RawSample>> {
    query_samples(conn, "id ASC").context("failed to load raw samples by insertion order")
}

pub(crate) fn insert_sample(conn: &Connection, sample: &RawSample) -> Result<i64> {
    conn.execute(
        "INSERT INTO raw_samples (timestamp, latitude, longitude, speed, processed, code, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            format_datetime(&sample.timestamp),
            sample.latitude,
            sample.longitude,
            sample.speed,
            sample.processed,
            sample.code,
            sample.note,
        ],
    )
    .context("failed to insert raw sample")?;
    Ok(conn.last_insert_rowid())
}

/// Flag the given rows processed. Returns the number of rows changed.
pub(crate) fn mark_processed(conn: &Connection, ids: &[i64]) -> Result<usize> {
    let mut stmt = conn.prepare_cached("UPDATE raw_samples SET processed = 1 WHERE id = ?1")?;
    let mut changed = 0;
    for id in ids {
        changed += stmt
            .execute(params![id])
            .with_context(|| format!("failed to mark raw sample {id} processed"))?;
    }
    Ok(changed)
}

pub(crate) fn delete_samples(conn: &Connection, ids: &[i64]) -> Result<usize> {
    let mut stmt = conn.prepare_cached("DELETE FROM raw_samples WHERE id = ?1")?;
    let mut deleted = 0;
    for id in ids {
        deleted += stmt
            .execute(params![id])
            .with_context(|| format!("failed to delete raw sample {id}"))?;
    }
    Ok(deleted)
}

pub(crate) fn reset_processed(conn: &Connection) -> Result<usize> {
    conn.execute("UPDATE raw_samples SET processed = 0 WHERE processed = 1", [])
        .context("failed to reset processed flags")
}

impl Database {
    /// Append one fix to the journal and return its row id.
    pub async fn insert_raw_sample(&self, sample: &RawSample) -> Result<i64> {
        let record = sample.clone();
        self.execute(move |conn| insert_sample(conn, &record)).await
    }

    /// Append a batch of fixes in one transaction, in slice order.
    pub async fn insert_raw_samples(&self, samples: &[RawSample]) -> Result<Vec<i64>> {
        let records = samples.to_vec();
        self.transaction(move |tx| {
            records
                .iter()
                .map(|record| insert_sample(tx, record))
                .collect()
        })
        .await
    }

    pub async fn get_raw_samples(&self) -> Result<Vec<RawSample>> {
        self.execute(|conn| load_samples_by_time(conn)).await
    }

    pub async fn get_raw_samples_by_insertion(&self) -> Result<Vec<RawSample>> {
        self.execute(|conn| load_samples_by_insertion(conn)).await
    }

    pub async fn count_raw_samples(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM raw_samples", [], |row| {
                row.get(0)
            })?;
            crate::db::helpers::to_usize(count, "raw sample count")
        })
        .await
    }

    pub async fn count_unprocessed_samples(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM raw_samples WHERE processed = 0",
                [],
                |row| row.get(0),
            )?;
            crate::db::helpers::to_usize(count, "unprocessed sample count")
        })
        .await
    }
}
