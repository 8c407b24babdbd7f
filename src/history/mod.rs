//! Monthly history: trips filed into `YYYY-MM` aggregates.
//!
//! Month totals are always rebuilt from the owned trips after a change.

pub mod rollup;

pub use rollup::{
    aggregate_month, delete_history_trip, rollup, rollup_pending, PendingRollupReport,
    RollupOutcome,
};
