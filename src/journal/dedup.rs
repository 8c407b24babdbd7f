use std::collections::HashSet;

use log::info;
use serde::Serialize;

use crate::db::{helpers::format_datetime, models::RawSample, repositories::raw_samples, Database};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupReport {
    pub samples_examined: usize,
    pub duplicates_removed: usize,
}

impl DedupReport {
    pub fn message(&self) -> String {
        format!(
            "Removed {} duplicate sample(s) out of {}",
            self.duplicates_removed, self.samples_examined
        )
    }
}

/// Identity used for duplicate detection.
///
/// Only timestamp and latitude take part, so two fixes at the same instant
/// and latitude collapse even if their longitudes differ.
fn sample_key(sample: &RawSample) -> (String, String) {
    (format_datetime(&sample.timestamp), sample.latitude.to_string())
}

/// Row ids of every sample whose key was already seen earlier in `samples`.
///
/// `samples` must be in insertion order; the first sample per key survives.
pub fn find_duplicates(samples: &[RawSample]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(samples.len());
    samples
        .iter()
        .filter(|sample| !seen.insert(sample_key(sample)))
        .filter_map(|sample| sample.id)
        .collect()
}

/// Delete duplicate samples from the journal in one transaction.
pub async fn dedup_journal(db: &Database) -> EngineResult<DedupReport> {
    let report = db
        .transaction(|tx| {
            let samples = raw_samples::load_samples_by_insertion(tx)?;
            let duplicates = find_duplicates(&samples);
            let removed = raw_samples::delete_samples(tx, &duplicates)?;
            Ok(DedupReport {
                samples_examined: samples.len(),
                duplicates_removed: removed,
            })
        })
        .await
        .map_err(EngineError::Storage)?;

    info!("{}", report.message());
    Ok(report)
}
