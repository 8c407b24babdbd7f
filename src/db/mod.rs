mod connection;
pub mod helpers;
mod migrations;
pub mod models;
pub(crate) mod repositories;

pub use connection::Database;
pub use models::{
    month_key, DetailRecord, HistoryTrip, MapRegion, MonthSummary, RawSample, TripEndpoint,
    TripScores, TripSummary,
};
