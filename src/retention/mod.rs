//! Retention limits for the raw journal and live trips.
//!
//! Every operation runs in one transaction and reports how many rows it
//! touched; a failure part way through deletes nothing.

pub mod purge;

pub use purge::{
    delete_trip, deprocess_journal, enforce_retention, purge_journal_by_trip_count,
    purge_trips_after, purge_trips_by_count, PurgeKind, PurgeReport, RetentionReport,
};

/// Limits applied by [`enforce_retention`]. A limit of zero disables that purge.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Live trips to keep, newest first.
    pub trip_count_limit: usize,
    /// Provisional trips' worth of raw samples to keep, newest first.
    pub journal_trip_count_limit: usize,
    /// Gap used to regroup the raw journal; same meaning as in segmentation.
    pub trip_separator_secs: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            trip_count_limit: 100,
            journal_trip_count_limit: 20,
            trip_separator_secs: 300,
        }
    }
}
