pub mod history;
pub mod raw_sample;
pub mod trip;

pub use history::{month_key, HistoryTrip, MonthSummary};
pub use raw_sample::RawSample;
pub use trip::{DetailRecord, MapRegion, TripEndpoint, TripScores, TripSummary};
