//! Raw GPS sample data model.
//!
//! One fix in the append-only journal written by the ingestion side. The
//! engine only ever flips `processed` and eventually deletes rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    #[serde(default)]
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Instantaneous speed in meters per second.
    pub speed: f64,
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl RawSample {
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64, speed: f64) -> Self {
        Self {
            id: None,
            timestamp,
            latitude,
            longitude,
            speed,
            processed: false,
            code: None,
            note: None,
        }
    }
}
