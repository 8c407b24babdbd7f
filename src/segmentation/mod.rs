pub mod algorithm;
pub mod config;
pub mod runner;
pub mod scoring;
pub mod summary;

pub use algorithm::{group_by_gap, segment_journal, SampleGroup, SegmentationOutcome};
pub use config::SegmentationConfig;
pub use runner::{SegmentationReport, TripProcessor};
pub use scoring::{score_trip, KinematicPoint};
pub use summary::build_trip_summary;
