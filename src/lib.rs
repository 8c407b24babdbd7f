pub mod collaborators;
pub mod db;
pub mod error;
pub mod geo;
pub mod history;
pub mod journal;
pub mod pipeline;
pub mod retention;
pub mod segmentation;
pub mod settings;

pub use collaborators::{CoordinateGeocoder, Geocoder, MapRenderer, NoMapRenderer};
pub use db::Database;
pub use error::{EngineError, EngineResult};
pub use pipeline::{process_all, ProcessReport};
pub use segmentation::{SegmentationConfig, TripProcessor};
pub use settings::{SettingsStore, TripSettings};

/// Initialize logging (reads RUST_LOG env var, defaults to info).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
