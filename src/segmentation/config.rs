use crate::error::{EngineError, EngineResult};

/// Thresholds for one segmentation pass.
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Largest gap between consecutive fixes that still belongs to one trip.
    pub trip_separator_secs: i64,

    /// Buffers smaller than this are consumed without producing a trip.
    pub min_entries_per_trip: usize,

    /// Treat every stored processed flag as false for this pass.
    pub force_reprocessing: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            trip_separator_secs: 300,
            min_entries_per_trip: 5,
            force_reprocessing: false,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.trip_separator_secs < 0 {
            return Err(EngineError::Configuration(format!(
                "trip separator must not be negative (got {}s)",
                self.trip_separator_secs
            )));
        }
        if self.min_entries_per_trip == 0 {
            return Err(EngineError::Configuration(
                "minimum entries per trip must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn separator_millis(&self) -> i64 {
        self.trip_separator_secs.saturating_mul(1000)
    }
}
