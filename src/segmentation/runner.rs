use std::{sync::Arc, time::Duration};

use anyhow::bail;
use log::{error, info, warn};
use serde::Serialize;
use tokio::time::timeout;

use crate::collaborators::{Geocoder, MapRenderer, TRIP_IMAGE_SIZE};
use crate::db::{
    models::TripSummary,
    repositories::{raw_samples, trips},
    Database,
};
use crate::error::{EngineError, EngineResult};
use crate::segmentation::{
    algorithm::segment_journal, config::SegmentationConfig, summary::build_trip_summary,
};

pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Counts from one segmentation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationReport {
    pub samples_scanned: usize,
    pub samples_consumed: usize,
    pub trips_created: usize,
    /// Stored trips overlapping a rebuilt trip, deleted in its favour.
    pub trips_replaced: usize,
    pub groups_discarded: usize,
    pub unresolved_addresses: usize,
}

impl SegmentationReport {
    pub fn message(&self) -> String {
        let mut message = format!(
            "Created {} trip(s) from {} of {} sample(s)",
            self.trips_created, self.samples_consumed, self.samples_scanned
        );
        if self.groups_discarded > 0 {
            message.push_str(&format!(
                "; {} group(s) too short to keep",
                self.groups_discarded
            ));
        }
        if self.trips_replaced > 0 {
            message.push_str(&format!("; {} rebuilt", self.trips_replaced));
        }
        if self.unresolved_addresses > 0 {
            message.push_str(&format!(
                "; {} trip(s) awaiting addresses",
                self.unresolved_addresses
            ));
        }
        message
    }
}

/// Drives segmentation passes against the journal.
#[derive(Clone)]
pub struct TripProcessor {
    db: Database,
    geocoder: Arc<dyn Geocoder>,
    renderer: Arc<dyn MapRenderer>,
    collaborator_timeout: Duration,
}

impl TripProcessor {
    pub fn new(db: Database, geocoder: Arc<dyn Geocoder>, renderer: Arc<dyn MapRenderer>) -> Self {
        Self {
            db,
            geocoder,
            renderer,
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, collaborator_timeout: Duration) -> Self {
        self.collaborator_timeout = collaborator_timeout;
        self
    }

    /// Segment the journal, build and score trips, and commit.
    ///
    /// Flag flips and trip inserts share one transaction, so a failure leaves
    /// the journal exactly as it was. Collaborators are called before the
    /// transaction opens.
    pub async fn run_pass(&self, config: &SegmentationConfig) -> EngineResult<SegmentationReport> {
        config.validate()?;

        let samples = self.db.get_raw_samples().await?;
        let outcome = segment_journal(&samples, config);

        let consumed_ids: Vec<i64> = outcome
            .consumed
            .iter()
            .filter_map(|&index| samples[index].id)
            .collect();

        let mut built: Vec<TripSummary> = outcome
            .trips
            .iter()
            .filter_map(|buffer| build_trip_summary(buffer))
            .collect();

        for trip in &mut built {
            self.enrich(trip).await;
        }

        let mut report = SegmentationReport {
            samples_scanned: samples.len(),
            samples_consumed: consumed_ids.len(),
            trips_created: built.len(),
            groups_discarded: outcome.discarded.len(),
            unresolved_addresses: built.iter().filter(|t| !t.addresses_resolved).count(),
            ..Default::default()
        };

        if consumed_ids.is_empty() {
            info!("Segmentation pass found nothing to consume");
            return Ok(report);
        }

        let replaced = self
            .db
            .transaction(move |tx| {
                let flagged = raw_samples::mark_processed(tx, &consumed_ids)?;
                if flagged != consumed_ids.len() {
                    bail!(
                        "expected to flag {} samples processed, flagged {}",
                        consumed_ids.len(),
                        flagged
                    );
                }

                let mut replaced = 0;
                for trip in &mut built {
                    let stale = trips::load_overlapping_trips(
                        tx,
                        &trip.origination.timestamp,
                        &trip.destination.timestamp,
                    )?;
                    trip.archived = inherits_archived(trip, &stale);
                    for old in &stale {
                        replaced += trips::delete_trip(tx, &old.id)?;
                    }
                    trips::insert_trip(tx, trip)?;
                }

                Ok(replaced)
            })
            .await
            .map_err(|err| {
                error!("Segmentation pass rolled back: {err:#}");
                EngineError::Storage(err)
            })?;

        report.trips_replaced = replaced;
        info!("{}", report.message());
        Ok(report)
    }

    /// Retry geocoding for trips stored without addresses.
    ///
    /// Returns the number of trips whose addresses are now resolved.
    pub async fn resolve_pending_addresses(&self) -> EngineResult<usize> {
        let pending = self
            .db
            .execute(|conn| trips::load_unresolved_trips(conn))
            .await?;

        if pending.is_empty() {
            return Ok(0);
        }

        let mut updates = Vec::with_capacity(pending.len());
        for trip in &pending {
            let origination = self
                .resolve(trip.origination.latitude, trip.origination.longitude)
                .await;
            let destination = self
                .resolve(trip.destination.latitude, trip.destination.longitude)
                .await;
            if let (Some(origination), Some(destination)) = (origination, destination) {
                updates.push((trip.id.clone(), origination, destination));
            }
        }

        let resolved = updates.len();
        if resolved > 0 {
            self.db
                .transaction(move |tx| {
                    for (trip_id, origination, destination) in &updates {
                        trips::update_addresses(tx, trip_id, origination, destination, true)?;
                    }
                    Ok(())
                })
                .await?;
        }

        info!(
            "Resolved addresses for {} of {} pending trip(s)",
            resolved,
            pending.len()
        );
        Ok(resolved)
    }

    async fn enrich(&self, trip: &mut TripSummary) {
        let origination = self
            .resolve(trip.origination.latitude, trip.origination.longitude)
            .await;
        let destination = self
            .resolve(trip.destination.latitude, trip.destination.longitude)
            .await;

        trip.addresses_resolved = origination.is_some() && destination.is_some();
        trip.origination.address = origination.unwrap_or_default();
        trip.destination.address = destination.unwrap_or_default();

        let render = self
            .renderer
            .render_trip_image(&trip.region, &trip.details, TRIP_IMAGE_SIZE);
        trip.map_image = match timeout(self.collaborator_timeout, render).await {
            Ok(image) => image,
            Err(_) => {
                warn!("Map rendering timed out for trip {}", trip.id);
                None
            }
        };
    }

    async fn resolve(&self, latitude: f64, longitude: f64) -> Option<String> {
        let lookup = self.geocoder.resolve_address(latitude, longitude);
        match timeout(self.collaborator_timeout, lookup).await {
            Ok(Ok(address)) if !address.is_empty() => Some(address),
            Ok(Ok(_)) => {
                warn!("Geocoder returned no address for ({latitude}, {longitude})");
                None
            }
            Ok(Err(err)) => {
                warn!("Address lookup failed for ({latitude}, {longitude}): {err}");
                None
            }
            Err(_) => {
                warn!("Address lookup timed out for ({latitude}, {longitude})");
                None
            }
        }
    }
}

/// A rebuilt trip is still filed only when it replaces exactly one stored trip
/// with identical endpoints; any other overlap yields a trip that needs filing.
fn inherits_archived(rebuilt: &TripSummary, stale: &[TripSummary]) -> bool {
    match stale {
        [old] => {
            old.archived
                && old.origination.timestamp == rebuilt.origination.timestamp
                && old.destination.timestamp == rebuilt.destination.timestamp
        }
        _ => false,
    }
}
