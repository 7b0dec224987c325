//! Traceroute log scanning.
//!
//! Finds hops where every probe timed out (`<hop> * * *`) and measures the
//! local router's latency from hop 1 lines.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use color_eyre::eyre::{Context, Result};
use regex::Regex;

use super::types::{HopLossSet, TracerouteSummary};

/// Hop number of the customer's own router.
pub const LOCAL_HOP: u32 = 1;

/// Compiled regex patterns for traceroute lines
pub struct TraceroutePatterns {
    /// Match: "<hop> * * *" with nothing else on the line
    pub full_loss: Regex,
    /// Match: "<hop> <anything>"
    pub hop_line: Regex,
    /// Match: "12.3 ms" or "12ms"
    pub latency: Regex,
}

impl TraceroutePatterns {
    pub fn new() -> Self {
        Self {
            full_loss: Regex::new(r"^\s*(\d+)\s+\*\s+\*\s+\*\s*$")
                .expect("Invalid full_loss regex"),
            hop_line: Regex::new(r"^\s*(\d+)\s+(.+)$").expect("Invalid hop_line regex"),
            latency: Regex::new(r"(\d+(?:\.\d+)?)\s*ms\b").expect("Invalid latency regex"),
        }
    }
}

impl Default for TraceroutePatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global patterns instance
pub static PATTERNS: LazyLock<TraceroutePatterns> = LazyLock::new(TraceroutePatterns::new);

/// Hops past the local router where all three probes timed out, deduplicated.
pub fn find_lossy_hops(content: &str) -> HopLossSet {
    let hops: BTreeSet<u32> = content
        .lines()
        .filter_map(|line| PATTERNS.full_loss.captures(line))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .filter(|hop| *hop > LOCAL_HOP)
        .collect();
    HopLossSet(hops)
}

/// Mean latency over every probe reported for hop 1.
pub fn local_hop_latency(content: &str) -> Option<f64> {
    let samples: Vec<f64> = content
        .lines()
        .filter_map(|line| PATTERNS.hop_line.captures(line))
        .filter(|caps| caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) == Some(LOCAL_HOP))
        .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
        .flat_map(|probes| {
            PATTERNS
                .latency
                .captures_iter(probes)
                .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
                .collect::<Vec<_>>()
        })
        .collect();

    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

pub fn analyze_traceroute(content: &str) -> TracerouteSummary {
    TracerouteSummary {
        lossy_hops: find_lossy_hops(content),
        local_hop_latency_ms: local_hop_latency(content),
    }
}

/// Read and analyze a traceroute log. A missing file yields an empty summary.
pub fn load_traceroute(path: &Path) -> Result<TracerouteSummary> {
    if !path.exists() {
        log::debug!("No traceroute log at {}", path.display());
        return Ok(TracerouteSummary::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read traceroute log: {}", path.display()))?;
    let summary = analyze_traceroute(&content);

    log::info!(
        "Traceroute {}: {} hops with full packet loss",
        path.display(),
        summary.lossy_hops.0.len()
    );
    Ok(summary)
}
