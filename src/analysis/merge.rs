//! Merging normalized sources into one chronological series.

use super::schema::SourceOutcome;
use super::types::{MeasurementRecord, SourceReport, Status};

/// All usable records from every source, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSeries {
    pub records: Vec<MeasurementRecord>,
    /// Rate-limited samples dropped during the merge
    pub blocked: usize,
    pub sources: Vec<SourceReport>,
}

impl MergedSeries {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Concatenate sources in the given order, drop `BLOCKED` samples and sort by
/// timestamp. Records with equal timestamps keep their concatenation order.
pub fn merge_sources(outcomes: Vec<SourceOutcome>) -> MergedSeries {
    let mut sources = Vec::with_capacity(outcomes.len());
    let mut combined = Vec::new();

    for outcome in outcomes {
        sources.push(outcome.report());
        if let SourceOutcome::Loaded { batch, .. } = outcome {
            combined.extend(batch.records);
        }
    }

    let before = combined.len();
    combined.retain(|record| record.status != Status::Blocked);
    let blocked = before - combined.len();
    if blocked > 0 {
        log::info!("Dropped {} rate-limited samples", blocked);
    }

    combined.sort_by_key(|record| record.timestamp);

    MergedSeries {
        records: combined,
        blocked,
        sources,
    }
}
