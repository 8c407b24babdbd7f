use chrono::{DateTime, Utc};

use crate::db::models::RawSample;
use crate::segmentation::config::SegmentationConfig;

/// Result of one scan over the journal.
#[derive(Debug, Default)]
pub struct SegmentationOutcome {
    /// Closed buffers that met the minimum size, in time order.
    pub trips: Vec<Vec<RawSample>>,
    /// Closed buffers below the minimum size. Their samples are still consumed.
    pub discarded: Vec<Vec<RawSample>>,
    /// Input indices of every sample consumed by this scan, ascending.
    pub consumed: Vec<usize>,
}

impl SegmentationOutcome {
    pub fn discarded_samples(&self) -> usize {
        self.discarded.iter().map(Vec::len).sum()
    }
}

/// Group a time-ordered journal into trip buffers.
///
/// Walks adjacent pairs `(previous, current)`. Every eligible `previous` is
/// copied into the open buffer and consumed. A gap wider than the separator
/// closes the buffer with `current` left to open the next one; on the final
/// pair `current` is appended instead. Samples already processed are skipped
/// unless `force_reprocessing` is set.
pub fn segment_journal(samples: &[RawSample], config: &SegmentationConfig) -> SegmentationOutcome {
    let mut outcome = SegmentationOutcome::default();

    if samples.len() < 2 {
        return outcome;
    }

    let separator_ms = config.separator_millis();
    let last_index = samples.len() - 1;
    let eligible = |sample: &RawSample| config.force_reprocessing || !sample.processed;
    let mut buffer: Vec<RawSample> = Vec::new();

    for index in 1..samples.len() {
        let previous = &samples[index - 1];
        let current = &samples[index];

        if !eligible(previous) {
            continue;
        }

        buffer.push(consume(previous));
        outcome.consumed.push(index - 1);

        let gap_ms = (current.timestamp - previous.timestamp).num_milliseconds();

        let closes = if gap_ms > separator_ms {
            true
        } else if index == last_index {
            if eligible(current) {
                buffer.push(consume(current));
                outcome.consumed.push(index);
            }
            true
        } else {
            false
        };

        if closes {
            close_buffer(&mut outcome, std::mem::take(&mut buffer), config);
        }
    }

    // Only reachable when the final pair was skipped.
    if !buffer.is_empty() {
        close_buffer(&mut outcome, buffer, config);
    }

    outcome
}

fn consume(sample: &RawSample) -> RawSample {
    let mut copy = sample.clone();
    copy.processed = true;
    copy
}

fn close_buffer(outcome: &mut SegmentationOutcome, buffer: Vec<RawSample>, config: &SegmentationConfig) {
    if buffer.len() >= config.min_entries_per_trip {
        outcome.trips.push(buffer);
    } else {
        outcome.discarded.push(buffer);
    }
}

/// A run of consecutive samples with no gap wider than the separator.
#[derive(Debug, Clone)]
pub struct SampleGroup {
    pub samples: Vec<RawSample>,
    pub end_time: DateTime<Utc>,
}

impl SampleGroup {
    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.samples.iter().filter_map(|sample| sample.id)
    }
}

/// Split a time-ordered journal on gaps wider than `separator_secs`.
///
/// Ignores processed flags and minimum sizes; retention uses this to find
/// provisional trip boundaries without building summaries.
pub fn group_by_gap(samples: Vec<RawSample>, separator_secs: i64) -> Vec<SampleGroup> {
    let separator_ms = separator_secs.saturating_mul(1000);
    let mut groups = Vec::new();
    let mut current_group: Option<SampleGroup> = None;

    for sample in samples {
        match &mut current_group {
            Some(group)
                if (sample.timestamp - group.end_time).num_milliseconds() <= separator_ms =>
            {
                group.end_time = sample.timestamp;
                group.samples.push(sample);
            }
            _ => {
                if let Some(group) = current_group.take() {
                    groups.push(group);
                }
                current_group = Some(SampleGroup {
                    end_time: sample.timestamp,
                    samples: vec![sample],
                });
            }
        }
    }

    if let Some(group) = current_group {
        groups.push(group);
    }

    groups
}
