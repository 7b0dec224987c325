//! Core data types for the measurement audit.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Outcome tag of a single speed test as written by the collector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Test completed normally
    Ok,
    /// Test ran but failed
    Fail,
    /// Link was down when the test was attempted
    Offline,
    /// Some phases of the test failed
    PartialFail,
    /// Rejected by the speed-test server's rate limiter
    Blocked,
    /// Status column absent or empty
    Unknown,
    /// Any other tag, kept verbatim
    Other(String),
}

impl Status {
    /// Parse a status tag, accepting common synonyms in any case.
    pub fn parse(raw: &str) -> Self {
        let tag = raw.trim();
        match tag.to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "" => Status::Unknown,
            "OK" | "SUCCESS" | "PASS" => Status::Ok,
            "FAIL" | "FAILED" | "FAILURE" | "ERROR" => Status::Fail,
            "OFFLINE" | "DOWN" | "DISCONNECTED" => Status::Offline,
            "PARTIAL_FAIL" | "PARTIALFAIL" | "PARTIAL" => Status::PartialFail,
            "BLOCKED" | "RATE_LIMITED" | "RATELIMITED" => Status::Blocked,
            _ => Status::Other(tag.to_string()),
        }
    }

    /// Whether the record is left out of throughput/latency statistics.
    pub fn is_excluded(&self) -> bool {
        match self {
            Status::Fail | Status::Offline | Status::PartialFail => true,
            Status::Ok | Status::Blocked | Status::Unknown | Status::Other(_) => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Fail => write!(f, "FAIL"),
            Status::Offline => write!(f, "OFFLINE"),
            Status::PartialFail => write!(f, "PARTIAL_FAIL"),
            Status::Blocked => write!(f, "BLOCKED"),
            Status::Unknown => write!(f, "UNKNOWN"),
            Status::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// One speed-test sample in the canonical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub timestamp: NaiveDateTime,
    pub server: Option<String>,
    pub isp_name: Option<String>,
    pub download_mbps: Option<f64>,
    pub max_latency_ms: Option<f64>,
    pub min_latency_ms: Option<f64>,
    pub loss_pct: Option<f64>,
    pub status: Status,
    /// Columns with no canonical mapping, passed through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl MeasurementRecord {
    /// A record carrying only a timestamp and status; every other field missing.
    pub fn new(timestamp: NaiveDateTime, status: Status) -> Self {
        Self {
            timestamp,
            server: None,
            isp_name: None,
            download_mbps: None,
            max_latency_ms: None,
            min_latency_ms: None,
            loss_pct: None,
            status,
            extra: BTreeMap::new(),
        }
    }
}

/// A suspected partial outage inferred from a gap in the series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutageEvent {
    /// Timestamp of the record that ended the gap
    pub occurred_at: NaiveDateTime,
    pub duration_minutes: i64,
}

/// Worst observed latency through one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStatistic {
    pub server: String,
    pub max_latency_ms: f64,
}

/// Per-route latency table plus the extremes picked from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// One entry per server, ordered by server name
    pub routes: Vec<RouteStatistic>,
    pub best: RouteStatistic,
    pub worst: RouteStatistic,
}

impl RouteSummary {
    /// True when there is nothing to contrast: best and worst are the same route.
    pub fn is_single_route(&self) -> bool {
        self.best.server == self.worst.server
    }
}

/// Distinct hops past the local router where every probe timed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopLossSet(pub BTreeSet<u32>);

impl HopLossSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn hops(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for HopLossSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hops: Vec<String> = self.0.iter().map(|h| h.to_string()).collect();
        write!(f, "Hops {}", hops.join(", "))
    }
}

/// Everything extracted from a traceroute log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracerouteSummary {
    pub lossy_hops: HopLossSet,
    /// Mean of all latency probes recorded for hop 1
    pub local_hop_latency_ms: Option<f64>,
}

/// Throughput and latency over valid records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub valid_records: usize,
    pub excluded_records: usize,
    pub average_download_mbps: Option<f64>,
    pub peak_latency_ms: Option<f64>,
}

/// What happened to one input source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceReport {
    Loaded {
        path: PathBuf,
        records: usize,
        rejected_rows: usize,
    },
    Missing {
        path: PathBuf,
    },
    Malformed {
        path: PathBuf,
        reason: String,
    },
}

impl SourceReport {
    pub fn path(&self) -> &PathBuf {
        match self {
            SourceReport::Loaded { path, .. }
            | SourceReport::Missing { path }
            | SourceReport::Malformed { path, .. } => path,
        }
    }
}

/// The typed result of one audit run, consumed by the renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub sources: Vec<SourceReport>,
    /// Records kept after dropping rate-limited samples
    pub total_records: usize,
    pub blocked_records: usize,
    pub first_record: NaiveDateTime,
    pub last_record: NaiveDateTime,
    pub outage_threshold_minutes: i64,
    pub summary: SummaryStats,
    pub routes: Option<RouteSummary>,
    pub outages: Vec<OutageEvent>,
    pub traceroute: TracerouteSummary,
}

/// Result of running the pipeline end to end
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    /// No source produced a usable record
    NoData { sources: Vec<SourceReport> },
    Complete(AuditReport),
}
