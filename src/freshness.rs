//! Collector liveness check.
//!
//! The speed-test collector appends to its report on a fixed interval; if the
//! file has not been written for longer than that, the collector has stopped.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Local, TimeDelta};
use color_eyre::eyre::{Context, Result};

/// Default allowance: the 30 minute collection interval plus processing time
pub const DEFAULT_MAX_DELAY_MINUTES: i64 = 40;

/// State of the collector's output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Written within the allowed delay
    Running {
        last_modified: DateTime<Local>,
        minutes_ago: i64,
    },
    /// Not written for longer than the allowed delay
    Stale {
        last_modified: DateTime<Local>,
        minutes_ago: i64,
    },
    Missing,
}

impl Freshness {
    pub fn is_running(&self) -> bool {
        matches!(self, Freshness::Running { .. })
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Running { last_modified, minutes_ago } => write!(
                f,
                "Last Log Entry: {} ({} mins ago)\nSTATUS: RUNNING ACTIVE",
                last_modified.format("%H:%M:%S"),
                minutes_ago
            ),
            Freshness::Stale { last_modified, minutes_ago } => write!(
                f,
                "Last Log Entry: {} ({} mins ago)\nSTATUS: STOPPED or STUCK",
                last_modified.format("%H:%M:%S"),
                minutes_ago
            ),
            Freshness::Missing => write!(f, "Error: Log file not found."),
        }
    }
}

/// Compare a file's modification time against `now`.
pub fn check_freshness(path: &Path, max_delay: TimeDelta, now: DateTime<Local>) -> Result<Freshness> {
    if !path.exists() {
        log::warn!("Collector output {} does not exist", path.display());
        return Ok(Freshness::Missing);
    }

    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("Failed to read modification time of {}", path.display()))?;
    let last_modified: DateTime<Local> = modified.into();
    let elapsed = now - last_modified;
    let minutes_ago = elapsed.num_minutes();

    log::debug!("{} last written {} minutes ago", path.display(), minutes_ago);

    if elapsed < max_delay {
        Ok(Freshness::Running { last_modified, minutes_ago })
    } else {
        Ok(Freshness::Stale { last_modified, minutes_ago })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fresh_file_is_running() {
        let file = NamedTempFile::new().unwrap();
        let status = check_freshness(file.path(), TimeDelta::minutes(40), Local::now()).unwrap();
        assert!(status.is_running());
        assert!(status.to_string().contains("RUNNING ACTIVE"));
    }

    #[test]
    fn test_old_file_is_stale() {
        let file = NamedTempFile::new().unwrap();
        let later = Local::now() + TimeDelta::minutes(90);
        let status = check_freshness(file.path(), TimeDelta::minutes(40), later).unwrap();
        match status {
            Freshness::Stale { minutes_ago, .. } => assert!(minutes_ago >= 89),
            other => panic!("expected stale, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let status = check_freshness(
            Path::new("/nonexistent/netaudit/report.csv"),
            TimeDelta::minutes(40),
            Local::now(),
        )
        .unwrap();
        assert_eq!(status, Freshness::Missing);
        assert_eq!(status.to_string(), "Error: Log file not found.");
    }
}
