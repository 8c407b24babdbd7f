//! Narrow interfaces to services the engine depends on but does not own.
//!
//! Both are best effort: the segmentation runner bounds every call with a
//! timeout and degrades to an empty address or no image on failure.

use async_trait::async_trait;

use crate::db::models::{DetailRecord, MapRegion};
use crate::error::EngineResult;

/// Reverse geocoding of a coordinate to a display address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve_address(&self, latitude: f64, longitude: f64) -> EngineResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Snapshot size requested for every trip.
pub const TRIP_IMAGE_SIZE: ImageSize = ImageSize {
    width: 640,
    height: 400,
};

/// Renders a trip's route over `region` to encoded image bytes.
#[async_trait]
pub trait MapRenderer: Send + Sync {
    async fn render_trip_image(
        &self,
        region: &MapRegion,
        points: &[DetailRecord],
        size: ImageSize,
    ) -> Option<Vec<u8>>;
}

/// Offline geocoder: the "address" is the formatted coordinate.
#[derive(Debug, Default, Clone)]
pub struct CoordinateGeocoder;

#[async_trait]
impl Geocoder for CoordinateGeocoder {
    async fn resolve_address(&self, latitude: f64, longitude: f64) -> EngineResult<String> {
        Ok(format!("{latitude:.5}, {longitude:.5}"))
    }
}

/// Renderer for hosts without a map backend.
#[derive(Debug, Default, Clone)]
pub struct NoMapRenderer;

#[async_trait]
impl MapRenderer for NoMapRenderer {
    async fn render_trip_image(
        &self,
        _region: &MapRegion,
        _points: &[DetailRecord],
        _size: ImageSize,
    ) -> Option<Vec<u8>> {
        None
    }
}
