use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RawSample;

/// Immutable copy of one raw sample's kinematic fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub code: Option<i64>,
    pub note: Option<String>,
}

impl From<&RawSample> for DetailRecord {
    fn from(sample: &RawSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            latitude: sample.latitude,
            longitude: sample.longitude,
            speed: sample.speed,
            code: sample.code,
            note: sample.note.clone(),
        }
    }
}

/// Start or end of a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripEndpoint {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl TripEndpoint {
    pub fn at(record: &DetailRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            latitude: record.latitude,
            longitude: record.longitude,
            address: String::new(),
        }
    }
}

/// Map viewport covering a trip, already padded for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRegion {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub latitude_span: f64,
    pub longitude_span: f64,
}

/// Behaviour scores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripScores {
    pub acceleration: f64,
    pub deceleration: f64,
    pub smoothness: f64,
}

impl Default for TripScores {
    fn default() -> Self {
        Self {
            acceleration: 100.0,
            deceleration: 100.0,
            smoothness: 100.0,
        }
    }
}

/// One completed, scored trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    pub id: String,
    pub origination: TripEndpoint,
    pub destination: TripEndpoint,
    /// Meters per second.
    pub max_speed: f64,
    pub duration_minutes: i64,
    pub distance_miles: f64,
    pub scores: TripScores,
    pub region: MapRegion,
    pub archived: bool,
    /// False while either endpoint address still needs a geocoding retry.
    pub addresses_resolved: bool,
    #[serde(skip)]
    pub map_image: Option<Vec<u8>>,
    pub details: Vec<DetailRecord>,
}

