//! Outage detection from gaps in the measurement series.
//!
//! The collector samples on a fixed interval, so a gap much longer than that
//! interval means the link was up but no test could complete.

use chrono::TimeDelta;

use super::types::{MeasurementRecord, OutageEvent};

/// Default gap that counts as an outage.
pub const DEFAULT_OUTAGE_THRESHOLD_MINUTES: i64 = 45;

/// Scans a chronologically sorted series for gaps longer than `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutageDetector {
    threshold: TimeDelta,
}

impl Default for OutageDetector {
    fn default() -> Self {
        Self::new(TimeDelta::minutes(DEFAULT_OUTAGE_THRESHOLD_MINUTES))
    }
}

impl OutageDetector {
    pub fn new(threshold: TimeDelta) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    /// One event per consecutive pair whose gap strictly exceeds the threshold,
    /// anchored at the later record. The input must already be sorted.
    /// Durations are whole minutes truncated toward zero, so a gap only
    /// seconds over the threshold reports the threshold itself.
    pub fn detect(&self, records: &[MeasurementRecord]) -> Vec<OutageEvent> {
        records
            .windows(2)
            .filter_map(|pair| {
                let gap = pair[1].timestamp - pair[0].timestamp;
                (gap > self.threshold).then(|| OutageEvent {
                    occurred_at: pair[1].timestamp,
                    duration_minutes: gap.num_minutes(),
                })
            })
            .collect()
    }
}
