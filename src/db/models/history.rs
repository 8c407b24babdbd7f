//! Monthly history data models.
//!
//! A `MonthSummary` owns its `HistoryTrip` rows, and each of those owns a
//! second, independent copy of the source trip's detail records, so purging
//! live trips never touches history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DetailRecord, TripEndpoint, TripScores, TripSummary};

/// A trip filed under a month.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTrip {
    pub id: String,
    pub month_key: String,
    pub origination: TripEndpoint,
    pub destination: TripEndpoint,
    pub max_speed: f64,
    pub duration_minutes: i64,
    pub distance_miles: f64,
    pub scores: TripScores,
    pub details: Vec<DetailRecord>,
}

impl HistoryTrip {
    /// Copy a live trip into history; details are cloned, not shared.
    pub fn from_trip(id: String, month_key: String, trip: &TripSummary) -> Self {
        Self {
            id,
            month_key,
            origination: trip.origination.clone(),
            destination: trip.destination.clone(),
            max_speed: trip.max_speed,
            duration_minutes: trip.duration_minutes,
            distance_miles: trip.distance_miles,
            scores: trip.scores,
            details: trip.details.clone(),
        }
    }
}

/// Aggregate for one calendar month, keyed `YYYY-MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub month_key: String,
    pub total_trips: i64,
    pub total_distance_miles: f64,
    pub total_duration_minutes: i64,
    pub highest_speed: f64,
    pub scores: TripScores,
    pub updated_at: DateTime<Utc>,
    /// Empty when loaded as a header only.
    pub trips: Vec<HistoryTrip>,
}

/// Month key for a timestamp, e.g. `2024-03`.
pub fn month_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m").to_string()
}
