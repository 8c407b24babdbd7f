use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{
    helpers::format_datetime,
    models::{month_key, HistoryTrip, MonthSummary, TripScores, TripSummary},
    repositories::{history, trips},
    Database,
};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum RollupOutcome {
    /// The trip was copied into the month.
    Filed { month_key: String },
    /// A history trip with the same origination already sits in the month.
    AlreadyFiled { month_key: String },
}

impl RollupOutcome {
    pub fn month_key(&self) -> &str {
        match self {
            RollupOutcome::Filed { month_key } | RollupOutcome::AlreadyFiled { month_key } => {
                month_key
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            RollupOutcome::Filed { month_key } => format!("Filed trip under {month_key}"),
            RollupOutcome::AlreadyFiled { month_key } => {
                format!("Trip already filed under {month_key}; nothing added")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRollupReport {
    pub trips_filed: usize,
    pub trips_skipped: usize,
    pub months_touched: Vec<String>,
}

impl PendingRollupReport {
    pub fn message(&self) -> String {
        format!(
            "Filed {} trip(s) into {} month(s); {} already filed",
            self.trips_filed,
            self.months_touched.len(),
            self.trips_skipped
        )
    }
}

/// Seed a month from a single trip, count 1.
fn seed_month(key: &str, trip: &TripSummary) -> MonthSummary {
    MonthSummary {
        month_key: key.to_string(),
        total_trips: 1,
        total_distance_miles: trip.distance_miles,
        total_duration_minutes: trip.duration_minutes,
        highest_speed: trip.max_speed,
        scores: trip.scores,
        updated_at: Utc::now(),
        trips: Vec::new(),
    }
}

/// Totals over `trips`, scores averaged. An empty slice yields zeroed totals.
pub fn aggregate_month(key: &str, trips: &[HistoryTrip]) -> MonthSummary {
    let mut month = MonthSummary {
        month_key: key.to_string(),
        total_trips: 0,
        total_distance_miles: 0.0,
        total_duration_minutes: 0,
        highest_speed: 0.0,
        scores: TripScores::default(),
        updated_at: Utc::now(),
        trips: Vec::new(),
    };

    if trips.is_empty() {
        return month;
    }

    let mut score_sum = TripScores {
        acceleration: 0.0,
        deceleration: 0.0,
        smoothness: 0.0,
    };
    for trip in trips {
        month.total_distance_miles += trip.distance_miles;
        month.total_duration_minutes += trip.duration_minutes;
        month.highest_speed = month.highest_speed.max(trip.max_speed);
        score_sum.acceleration += trip.scores.acceleration;
        score_sum.deceleration += trip.scores.deceleration;
        score_sum.smoothness += trip.scores.smoothness;
    }

    let count = trips.len() as f64;
    month.total_trips = trips.len() as i64;
    month.scores = TripScores {
        acceleration: score_sum.acceleration / count,
        deceleration: score_sum.deceleration / count,
        smoothness: score_sum.smoothness / count,
    };
    month
}

/// Rebuild the month's totals from the trips it owns.
pub(crate) fn recompute_month(conn: &Connection, key: &str) -> anyhow::Result<MonthSummary> {
    let owned = history::load_history_trips(conn, key)?;
    let month = aggregate_month(key, &owned);
    history::update_month_totals(conn, &month)?;
    Ok(month)
}

/// File `trip` under its month and archive it. Runs inside the caller's transaction.
fn file_trip(conn: &Connection, trip: &TripSummary) -> anyhow::Result<RollupOutcome> {
    let key = month_key(&trip.origination.timestamp);

    let outcome = if !history::month_exists(conn, &key)? {
        history::insert_month(conn, &seed_month(&key, trip))?;
        insert_copy(conn, &key, trip)?;
        RollupOutcome::Filed { month_key: key.clone() }
    } else if history::history_trip_filed(conn, &key, &trip.origination.timestamp)? {
        info!(
            "Trip starting {} is already filed under {key}; skipping",
            format_datetime(&trip.origination.timestamp)
        );
        RollupOutcome::AlreadyFiled { month_key: key.clone() }
    } else {
        insert_copy(conn, &key, trip)?;
        RollupOutcome::Filed { month_key: key.clone() }
    };

    trips::mark_archived(conn, &trip.id)?;
    recompute_month(conn, &key)?;
    Ok(outcome)
}

fn insert_copy(conn: &Connection, key: &str, trip: &TripSummary) -> anyhow::Result<()> {
    let copy = HistoryTrip::from_trip(Uuid::new_v4().to_string(), key.to_string(), trip);
    history::insert_history_trip(conn, &copy)
}

/// File the trip starting at `origination` into its month.
pub async fn rollup(db: &Database, origination: DateTime<Utc>) -> EngineResult<RollupOutcome> {
    let outcome = db
        .transaction(move |tx| match trips::load_trip(tx, &origination)? {
            Some(trip) => file_trip(tx, &trip).map(Some),
            None => Ok(None),
        })
        .await
        .map_err(|err| {
            error!("Rollup rolled back: {err:#}");
            EngineError::Storage(err)
        })?
        .ok_or_else(|| EngineError::not_found("trip", format_datetime(&origination)))?;

    info!("{}", outcome.message());
    Ok(outcome)
}

/// File every trip not yet archived, oldest first, in one transaction.
pub async fn rollup_pending(db: &Database) -> EngineResult<PendingRollupReport> {
    let report = db
        .transaction(|tx| {
            let mut report = PendingRollupReport::default();
            for header in trips::load_unarchived_oldest_first(tx)? {
                // Headers carry no details; reload the full trip before copying.
                let Some(trip) = trips::load_trip(tx, &header.origination.timestamp)? else {
                    continue;
                };
                let outcome = file_trip(tx, &trip)?;
                match &outcome {
                    RollupOutcome::Filed { .. } => report.trips_filed += 1,
                    RollupOutcome::AlreadyFiled { .. } => report.trips_skipped += 1,
                }
                let key = outcome.month_key().to_string();
                if !report.months_touched.contains(&key) {
                    report.months_touched.push(key);
                }
            }
            Ok(report)
        })
        .await
        .map_err(|err| {
            error!("Pending rollup rolled back: {err:#}");
            EngineError::Storage(err)
        })?;

    info!("{}", report.message());
    Ok(report)
}

/// Remove a filed trip; an emptied month is deleted, otherwise recomputed.
pub async fn delete_history_trip(db: &Database, origination: DateTime<Utc>) -> EngineResult<()> {
    let key = db
        .transaction(move |tx| {
            let Some(trip) = history::find_history_trip(tx, &origination)? else {
                return Ok(None);
            };
            history::delete_history_trip(tx, &trip.id)?;

            if history::load_history_trips(tx, &trip.month_key)?.is_empty() {
                history::delete_month(tx, &trip.month_key)?;
                info!("Month {} has no trips left; removed", trip.month_key);
            } else {
                recompute_month(tx, &trip.month_key)?;
            }
            Ok(Some(trip.month_key))
        })
        .await
        .map_err(|err| {
            error!("History delete rolled back: {err:#}");
            EngineError::Storage(err)
        })?
        .ok_or_else(|| EngineError::not_found("history trip", format_datetime(&origination)))?;

    info!(
        "Deleted history trip starting {} from {key}",
        format_datetime(&origination)
    );
    Ok(())
}
