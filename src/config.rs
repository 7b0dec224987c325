use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::analysis::outage::{OutageDetector, DEFAULT_OUTAGE_THRESHOLD_MINUTES};
use crate::analysis::schema::{CanonicalField, ColumnAliases, DateOrder};

/// Report files written by the speed-test collector, newest format last
pub const DEFAULT_SOURCES: &[&str] = &["network_performance_report.csv", "network_report_v2.csv"];

pub const DEFAULT_TRACEROUTE: &str = "traceroute_logs.txt";

/// Top-level audit configuration that mirrors the YAML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Measurement reports to merge, in concatenation order
    pub sources: Vec<SourceConfig>,
    /// Traceroute log to scan for packet loss
    pub traceroute: PathBuf,
    /// Gap between samples that counts as an outage (e.g., "45m")
    #[serde(with = "humantime_serde")]
    pub outage_threshold: Duration,
    /// Subscribed plan speed quoted in the report
    pub plan_speed_mbps: f64,
    /// Provider addressed by the complaint
    pub provider: String,
    /// How to read day/month-ambiguous dates
    pub date_order: DateOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// One measurement report and any header spellings peculiar to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Extra header alias -> canonical field, on top of the built-in table
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, CanonicalField>,
}

impl SourceConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            aliases: BTreeMap::new(),
        }
    }

    /// Alias table used to normalize this source
    pub fn column_aliases(&self) -> ColumnAliases {
        ColumnAliases::default().extended(&self.aliases)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|p| SourceConfig::new(*p)).collect(),
            traceroute: PathBuf::from(DEFAULT_TRACEROUTE),
            outage_threshold: Duration::from_secs(DEFAULT_OUTAGE_THRESHOLD_MINUTES as u64 * 60),
            plan_speed_mbps: 100.0,
            provider: "ACT".to_string(),
            date_order: DateOrder::default(),
            log_level: None,
        }
    }
}

impl AuditConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sources.is_empty() {
            return Err(ValidationError::InvalidSources(
                "at least one measurement report is required".to_string(),
            ));
        }
        if self.sources.iter().any(|s| s.path.as_os_str().is_empty()) {
            return Err(ValidationError::InvalidSources(
                "source path cannot be empty".to_string(),
            ));
        }

        if self.outage_threshold < Duration::from_secs(60) {
            return Err(ValidationError::InvalidThreshold(format!(
                "outage threshold must be at least one minute, got {:?}",
                self.outage_threshold
            )));
        }
        if TimeDelta::from_std(self.outage_threshold).is_err() {
            return Err(ValidationError::InvalidThreshold(format!(
                "outage threshold {:?} is out of range",
                self.outage_threshold
            )));
        }

        if !self.plan_speed_mbps.is_finite() || self.plan_speed_mbps <= 0.0 {
            return Err(ValidationError::InvalidReport(format!(
                "plan_speed_mbps must be positive, got {}",
                self.plan_speed_mbps
            )));
        }
        if self.provider.trim().is_empty() {
            return Err(ValidationError::InvalidReport(
                "provider cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Outage detector for the configured threshold
    pub fn outage_detector(&self) -> OutageDetector {
        let threshold = TimeDelta::from_std(self.outage_threshold).unwrap_or(TimeDelta::MAX);
        OutageDetector::new(threshold)
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid source configuration: {0}")]
    InvalidSources(String),
    #[error("Invalid outage threshold: {0}")]
    InvalidThreshold(String),
    #[error("Invalid report configuration: {0}")]
    InvalidReport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AuditConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.outage_detector().threshold(), TimeDelta::minutes(45));
    }

    #[test]
    fn test_parse_yaml_with_aliases() {
        let yaml = r#"
sources:
  - path: "speedtest_a.csv"
  - path: "speedtest_b.csv"
    aliases:
      Ping_Max: max_latency_ms
      Provider: isp_name
outage_threshold: "1h 30m"
plan_speed_mbps: 300
provider: "Example Broadband"
date_order: day_first
"#;
        let config: AuditConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.outage_threshold, Duration::from_secs(90 * 60));
        assert_eq!(config.date_order, DateOrder::DayFirst);
        assert_eq!(config.traceroute, PathBuf::from(DEFAULT_TRACEROUTE));

        let aliases = config.sources[1].column_aliases();
        assert_eq!(aliases.resolve("ping_max"), Some(CanonicalField::MaxLatencyMs));
        assert_eq!(aliases.resolve("Timestamp_UTC"), Some(CanonicalField::Timestamp));
    }

    #[test]
    fn test_unknown_canonical_field_is_rejected() {
        let yaml = r#"
sources:
  - path: "a.csv"
    aliases:
      Jitter: jitter_ms
"#;
        assert!(serde_yaml::from_str::<AuditConfig>(yaml).is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AuditConfig::default();
        config.sources.clear();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidSources(_))));

        let mut config = AuditConfig::default();
        config.outage_threshold = Duration::from_secs(0);
        assert!(matches!(config.validate(), Err(ValidationError::InvalidThreshold(_))));

        let mut config = AuditConfig::default();
        config.plan_speed_mbps = -5.0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidReport(_))));
    }
}
