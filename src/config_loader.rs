use crate::config::{AuditConfig, SourceConfig};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<AuditConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;

    let config: AuditConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration '{}'", config_path.display()))?;

    config.validate()?;

    info!("Configured {} measurement sources", config.sources.len());
    Ok(config)
}

/// Log level named in the configuration file, read without logging or
/// validating so the logger can be set up before `load_config` runs.
/// Any problem with the file is left for `load_config` to report.
pub fn peek_log_level(config_path: Option<&Path>) -> Option<String> {
    #[derive(Deserialize)]
    struct LogSection {
        log_level: Option<String>,
    }

    let file = File::open(config_path?).ok()?;
    serde_yaml::from_reader::<_, LogSection>(file)
        .ok()
        .and_then(|section| section.log_level)
}

/// Load the file when one is given, otherwise start from defaults
pub fn load_or_default(config_path: Option<&Path>) -> Result<AuditConfig> {
    match config_path {
        Some(path) => load_config(path),
        None => Ok(AuditConfig::default()),
    }
}

/// CLI arguments that override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Replaces the configured source list when non-empty
    pub sources: Vec<PathBuf>,
    pub traceroute: Option<PathBuf>,
    pub threshold_minutes: Option<u64>,
    pub plan_speed_mbps: Option<f64>,
    pub provider: Option<String>,
}

/// Apply CLI overrides to a loaded configuration
pub fn apply_overrides(config: &mut AuditConfig, overrides: &CliOverrides) -> Result<()> {
    if !overrides.sources.is_empty() {
        info!("Source list overridden from the command line");
        config.sources = overrides.sources.iter().map(SourceConfig::new).collect();
    }

    if let Some(traceroute) = &overrides.traceroute {
        config.traceroute = traceroute.clone();
    }

    if let Some(minutes) = overrides.threshold_minutes {
        config.outage_threshold = Duration::from_secs(minutes.saturating_mul(60));
    }

    if let Some(speed) = overrides.plan_speed_mbps {
        config.plan_speed_mbps = speed;
    }

    if let Some(provider) = &overrides.provider {
        config.provider = provider.clone();
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
sources:
  - path: "network_performance_report.csv"
traceroute: "trace.txt"
outage_threshold: "30m"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.traceroute, PathBuf::from("trace.txt"));
        assert_eq!(config.outage_threshold, Duration::from_secs(1800));
        assert_eq!(config.plan_speed_mbps, 100.0);
    }

    #[test]
    fn test_load_invalid_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "sources: []\n").unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_peek_log_level() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "log_level: debug\nsources: []\n").unwrap();

        // Invalid sources do not hide the level; load_config still rejects the file
        assert_eq!(peek_log_level(Some(temp_file.path())), Some("debug".to_string()));
        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_peek_log_level_without_file() {
        assert_eq!(peek_log_level(None), None);
        assert_eq!(peek_log_level(Some(Path::new("/nonexistent/netaudit.yaml"))), None);

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "outage_threshold: \"30m\"\n").unwrap();
        assert_eq!(peek_log_level(Some(temp_file.path())), None);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = AuditConfig::default();

        let overrides = CliOverrides {
            sources: vec![PathBuf::from("only.csv")],
            threshold_minutes: Some(60),
            plan_speed_mbps: Some(250.0),
            provider: Some("Example ISP".to_string()),
            ..Default::default()
        };

        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.sources, vec![SourceConfig::new("only.csv")]);
        assert_eq!(config.outage_threshold, Duration::from_secs(3600));
        assert_eq!(config.plan_speed_mbps, 250.0);
        assert_eq!(config.provider, "Example ISP");
    }

    #[test]
    fn test_overrides_are_validated() {
        let mut config = AuditConfig::default();
        let overrides = CliOverrides {
            threshold_minutes: Some(0),
            ..Default::default()
        };
        assert!(apply_overrides(&mut config, &overrides).is_err());
    }
}
