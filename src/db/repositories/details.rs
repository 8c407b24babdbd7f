//! Detail rows shared by `trip_details` and `history_details`.
//!
//! Both tables hold full copies; nothing links a history row back to the
//! live trip it came from.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{
    helpers::{format_datetime, parse_datetime, to_i64},
    models::DetailRecord,
};

#[derive(Debug, Clone, Copy)]
pub(crate) enum DetailTable {
    Trip,
    History,
}

impl DetailTable {
    fn table(self) -> &'static str {
        match self {
            DetailTable::Trip => "trip_details",
            DetailTable::History => "history_details",
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            DetailTable::Trip => "trip_id",
            DetailTable::History => "history_trip_id",
        }
    }
}

fn row_to_detail(row: &Row) -> Result<DetailRecord> {
    let timestamp: String = row.get("timestamp")?;

    Ok(DetailRecord {
        timestamp: parse_datetime(&timestamp, "detail timestamp")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        speed: row.get("speed")?,
        code: row.get("code")?,
        note: row.get("note")?,
    })
}

pub(crate) fn insert_details(
    conn: &Connection,
    table: DetailTable,
    owner_id: &str,
    details: &[DetailRecord],
) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} ({}, seq, timestamp, latitude, longitude, speed, code, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        table.table(),
        table.owner_column()
    );
    let mut stmt = conn.prepare_cached(&sql)?;

    for (seq, detail) in details.iter().enumerate() {
        stmt.execute(params![
            owner_id,
            to_i64(seq)?,
            format_datetime(&detail.timestamp),
            detail.latitude,
            detail.longitude,
            detail.speed,
            detail.code,
            detail.note,
        ])
        .with_context(|| format!("failed to insert {} row for {owner_id}", table.table()))?;
    }

    Ok(())
}

pub(crate) fn load_details(
    conn: &Connection,
    table: DetailTable,
    owner_id: &str,
) -> Result<Vec<DetailRecord>> {
    let sql = format!(
        "SELECT timestamp, latitude, longitude, speed, code, note
         FROM {}
         WHERE {} = ?1
         ORDER BY seq ASC",
        table.table(),
        table.owner_column()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut rows = stmt.query(params![owner_id])?;
    let mut details = Vec::new();
    while let Some(row) = rows.next()? {
        details.push(row_to_detail(row)?);
    }
    Ok(details)
}
