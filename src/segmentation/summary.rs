use uuid::Uuid;

use crate::db::models::{DetailRecord, MapRegion, RawSample, TripEndpoint, TripSummary};
use crate::geo::distance_miles;
use crate::segmentation::scoring::score_trip;

/// Each span of the bounding box is widened by this factor for map rendering.
pub const REGION_PADDING_FACTOR: f64 = 1.4;

/// Assemble a trip from a closed, time-ordered buffer.
///
/// Returns `None` for an empty buffer. Addresses are left empty and
/// `addresses_resolved` false; the runner fills them in from the geocoder.
pub fn build_trip_summary(buffer: &[RawSample]) -> Option<TripSummary> {
    let first = buffer.first()?;
    let last = buffer.last()?;

    let details: Vec<DetailRecord> = buffer.iter().map(DetailRecord::from).collect();

    let duration_minutes = (last.timestamp - first.timestamp).num_minutes().max(0);
    let max_speed = buffer
        .iter()
        .map(|sample| sample.speed)
        .fold(0.0_f64, f64::max);

    Some(TripSummary {
        id: Uuid::new_v4().to_string(),
        origination: TripEndpoint::at(&details[0]),
        destination: TripEndpoint::at(&details[details.len() - 1]),
        max_speed,
        duration_minutes,
        distance_miles: path_length_miles(&details),
        scores: score_trip(&details),
        region: padded_region(&details),
        archived: false,
        addresses_resolved: false,
        map_image: None,
        details,
    })
}

/// Accumulated haversine length over every consecutive pair.
pub fn path_length_miles(details: &[DetailRecord]) -> f64 {
    details
        .windows(2)
        .map(|pair| {
            distance_miles(
                pair[0].latitude,
                pair[0].longitude,
                pair[1].latitude,
                pair[1].longitude,
            )
        })
        .sum()
}

/// Bounding box of all points, spans scaled by [`REGION_PADDING_FACTOR`].
pub fn padded_region(details: &[DetailRecord]) -> MapRegion {
    let mut min_lat = f64::INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    let mut min_lon = f64::INFINITY;
    let mut max_lon = f64::NEG_INFINITY;

    for detail in details {
        min_lat = min_lat.min(detail.latitude);
        max_lat = max_lat.max(detail.latitude);
        min_lon = min_lon.min(detail.longitude);
        max_lon = max_lon.max(detail.longitude);
    }

    if details.is_empty() {
        return MapRegion {
            center_latitude: 0.0,
            center_longitude: 0.0,
            latitude_span: 0.0,
            longitude_span: 0.0,
        };
    }

    MapRegion {
        center_latitude: (min_lat + max_lat) / 2.0,
        center_longitude: (min_lon + max_lon) / 2.0,
        latitude_span: (max_lat - min_lat) * REGION_PADDING_FACTOR,
        longitude_span: (max_lon - min_lon) * REGION_PADDING_FACTOR,
    }
}
