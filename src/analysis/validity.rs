//! Validity classification and summary statistics.

use super::types::{MeasurementRecord, SummaryStats};

/// Records split by whether they count towards statistics.
///
/// Excluded records stay in the merged series for outage timing; this is a
/// view over it, not a filter.
#[derive(Debug, Clone, Default)]
pub struct Classified<'a> {
    pub valid: Vec<&'a MeasurementRecord>,
    pub excluded: Vec<&'a MeasurementRecord>,
}

pub fn classify(records: &[MeasurementRecord]) -> Classified<'_> {
    let (excluded, valid): (Vec<_>, Vec<_>) = records.iter().partition(|record| record.status.is_excluded());
    Classified { valid, excluded }
}

/// Mean of the present values, `None` when there are none.
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
}

/// Average throughput and peak latency over the valid records.
pub fn summarize(classified: &Classified<'_>) -> SummaryStats {
    SummaryStats {
        valid_records: classified.valid.len(),
        excluded_records: classified.excluded.len(),
        average_download_mbps: mean(classified.valid.iter().filter_map(|r| r.download_mbps)),
        peak_latency_ms: max(classified.valid.iter().filter_map(|r| r.max_latency_ms)),
    }
}
