//! One background pass over everything: dedup, segment, file, then retain.

use log::info;
use serde::Serialize;

use crate::db::Database;
use crate::error::EngineResult;
use crate::history::{rollup_pending, PendingRollupReport};
use crate::journal::{dedup_journal, DedupReport};
use crate::retention::{enforce_retention, RetentionReport};
use crate::segmentation::{SegmentationReport, TripProcessor};
use crate::settings::TripSettings;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReport {
    pub dedup: DedupReport,
    pub segmentation: SegmentationReport,
    pub rollup: PendingRollupReport,
    pub retention: RetentionReport,
}

impl ProcessReport {
    pub fn message(&self) -> String {
        [
            self.dedup.message(),
            self.segmentation.message(),
            self.rollup.message(),
            self.retention.message(),
        ]
        .join("\n")
    }
}

/// Run every stage in order, stopping at the first failure.
///
/// Each stage commits on its own, so a failure leaves earlier stages applied
/// and the failing one rolled back.
pub async fn process_all(
    db: &Database,
    processor: &TripProcessor,
    settings: &TripSettings,
) -> EngineResult<ProcessReport> {
    settings.validate()?;
    let segmentation_config = settings.segmentation_config(false)?;

    let dedup = dedup_journal(db).await?;
    let segmentation = processor.run_pass(&segmentation_config).await?;
    let rollup = rollup_pending(db).await?;
    let retention = enforce_retention(db, &settings.retention_config()).await?;

    let report = ProcessReport {
        dedup,
        segmentation,
        rollup,
        retention,
    };
    info!("Full pass complete");
    Ok(report)
}
