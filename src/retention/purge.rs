use anyhow::bail;
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;

use crate::db::{
    helpers::format_datetime,
    repositories::{raw_samples, trips},
    Database,
};
use crate::error::{EngineError, EngineResult};
use crate::segmentation::algorithm::group_by_gap;

use super::RetentionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PurgeKind {
    TripsByCount,
    TripsByDate,
    JournalByTripCount,
    Deprocess,
}

impl PurgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurgeKind::TripsByCount => "trips by count",
            PurgeKind::TripsByDate => "trips by date",
            PurgeKind::JournalByTripCount => "journal by trip count",
            PurgeKind::Deprocess => "deprocess",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub kind: PurgeKind,
    pub affected: usize,
}

impl PurgeReport {
    pub fn message(&self) -> String {
        match self.kind {
            PurgeKind::TripsByCount | PurgeKind::TripsByDate => {
                format!("Purged {} trip(s) ({})", self.affected, self.kind.as_str())
            }
            PurgeKind::JournalByTripCount => {
                format!("Purged {} raw sample(s) from the journal", self.affected)
            }
            PurgeKind::Deprocess => {
                format!("Reset {} sample(s) for reprocessing", self.affected)
            }
        }
    }
}

fn storage_failure(kind: PurgeKind) -> impl FnOnce(anyhow::Error) -> EngineError {
    move |err| {
        error!("Purge ({}) abandoned: {err:#}", kind.as_str());
        EngineError::Storage(err)
    }
}

/// Keep the `limit` newest trips by origination; delete the rest.
pub async fn purge_trips_by_count(db: &Database, limit: usize) -> EngineResult<PurgeReport> {
    let kind = PurgeKind::TripsByCount;
    let affected = db
        .transaction(move |tx| {
            let stale: Vec<String> = trips::load_trips_newest_first(tx)?
                .into_iter()
                .skip(limit)
                .map(|trip| trip.id)
                .collect();

            let mut deleted = 0;
            for trip_id in &stale {
                deleted += trips::delete_trip(tx, trip_id)?;
            }
            if deleted != stale.len() {
                bail!("expected to delete {} trips, deleted {}", stale.len(), deleted);
            }
            Ok(deleted)
        })
        .await
        .map_err(storage_failure(kind))?;

    let report = PurgeReport { kind, affected };
    info!("{}", report.message());
    Ok(report)
}

/// Delete every trip whose origination is strictly later than `cutoff`.
pub async fn purge_trips_after(db: &Database, cutoff: DateTime<Utc>) -> EngineResult<PurgeReport> {
    let kind = PurgeKind::TripsByDate;
    let affected = db
        .transaction(move |tx| {
            let stale: Vec<String> = trips::load_trips_newest_first(tx)?
                .into_iter()
                .take_while(|trip| trip.origination.timestamp > cutoff)
                .map(|trip| trip.id)
                .collect();

            let mut deleted = 0;
            for trip_id in &stale {
                deleted += trips::delete_trip(tx, trip_id)?;
            }
            if deleted != stale.len() {
                bail!("expected to delete {} trips, deleted {}", stale.len(), deleted);
            }
            Ok(deleted)
        })
        .await
        .map_err(storage_failure(kind))?;

    let report = PurgeReport { kind, affected };
    info!("{} after {}", report.message(), format_datetime(&cutoff));
    Ok(report)
}

/// Keep the raw samples of the `limit` most recent provisional trips.
///
/// The journal is regrouped on `separator_secs` gaps without building
/// summaries; every sample in an older group is deleted.
pub async fn purge_journal_by_trip_count(
    db: &Database,
    limit: usize,
    separator_secs: i64,
) -> EngineResult<PurgeReport> {
    if separator_secs < 0 {
        return Err(EngineError::Configuration(format!(
            "trip separator must not be negative (got {separator_secs}s)"
        )));
    }

    let kind = PurgeKind::JournalByTripCount;
    let affected = db
        .transaction(move |tx| {
            let groups = group_by_gap(raw_samples::load_samples_by_time(tx)?, separator_secs);
            let stale_groups = groups.len().saturating_sub(limit);
            let stale: Vec<i64> = groups
                .iter()
                .take(stale_groups)
                .flat_map(|group| group.ids())
                .collect();

            let deleted = raw_samples::delete_samples(tx, &stale)?;
            if deleted != stale.len() {
                bail!("expected to delete {} samples, deleted {}", stale.len(), deleted);
            }
            Ok(deleted)
        })
        .await
        .map_err(storage_failure(kind))?;

    let report = PurgeReport { kind, affected };
    info!("{}", report.message());
    Ok(report)
}

/// Clear the processed flag on every sample so the next pass regroups all of them.
pub async fn deprocess_journal(db: &Database) -> EngineResult<PurgeReport> {
    let kind = PurgeKind::Deprocess;
    let affected = db
        .transaction(|tx| raw_samples::reset_processed(tx))
        .await
        .map_err(storage_failure(kind))?;

    let report = PurgeReport { kind, affected };
    info!("{}", report.message());
    Ok(report)
}

/// User-initiated removal of a single live trip.
pub async fn delete_trip(db: &Database, origination: DateTime<Utc>) -> EngineResult<()> {
    let deleted = db
        .transaction(move |tx| trips::delete_trips_by_origination(tx, &origination))
        .await?;

    if deleted == 0 {
        return Err(EngineError::not_found("trip", format_datetime(&origination)));
    }
    info!("Deleted trip starting {}", format_datetime(&origination));
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionReport {
    pub trips_purged: usize,
    pub samples_purged: usize,
}

impl RetentionReport {
    pub fn message(&self) -> String {
        format!(
            "Retention removed {} trip(s) and {} raw sample(s)",
            self.trips_purged, self.samples_purged
        )
    }
}

/// Apply both configured limits. A zero limit skips that purge.
pub async fn enforce_retention(db: &Database, config: &RetentionConfig) -> EngineResult<RetentionReport> {
    let mut report = RetentionReport::default();

    if config.trip_count_limit > 0 {
        report.trips_purged = purge_trips_by_count(db, config.trip_count_limit)
            .await?
            .affected;
    }

    if config.journal_trip_count_limit > 0 {
        report.samples_purged = purge_journal_by_trip_count(
            db,
            config.journal_trip_count_limit,
            config.trip_separator_secs,
        )
        .await?
        .affected;
    }

    info!("{}", report.message());
    Ok(report)
}
