//! Report generation for the network audit.
//!
//! Renders the complaint email from an [`AuditReport`] and writes JSON/text copies.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use super::types::*;
use crate::config::AuditConfig;

const RULE_WIDTH: usize = 70;

/// Presentation settings that are not derived from the data
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub plan_speed_mbps: f64,
    pub provider: String,
}

impl From<&AuditConfig> for ReportOptions {
    fn from(config: &AuditConfig) -> Self {
        Self {
            plan_speed_mbps: config.plan_speed_mbps,
            provider: config.provider.clone(),
        }
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}", v))
}

/// Whole hours between the first and last sample, at least one
fn observation_hours(report: &AuditReport) -> i64 {
    let minutes = (report.last_record - report.first_record).num_minutes();
    ((minutes as f64 / 60.0).round() as i64).max(1)
}

/// Render the full complaint report as plain text
pub fn render_complaint(report: &AuditReport, options: &ReportOptions) -> String {
    let mut lines: Vec<String> = Vec::new();
    let avg_speed = format_value(report.summary.average_download_mbps);
    let peak_latency = format_value(report.summary.peak_latency_ms);

    lines.push("--- NETWORK PERFORMANCE AUDIT (STANDARD ANALYSIS) ---".to_string());
    lines.push(String::new());
    lines.push("SUMMARY STATISTICS".to_string());
    lines.push(format!("  - Average Download Speed: {} Mbps", avg_speed));
    lines.push(format!("  - Peak Observed Latency: {} ms", peak_latency));
    lines.push(format!(
        "  - Samples: {} ({} valid, {} failed, {} rate-limited dropped)",
        report.total_records,
        report.summary.valid_records,
        report.summary.excluded_records,
        report.blocked_records
    ));
    lines.push(String::new());

    lines.push("=".repeat(RULE_WIDTH));
    lines.push("FINAL ISP COMPLAINT EMAIL".to_string());
    lines.push("=".repeat(RULE_WIDTH));
    lines.push("Subject: Technical Complaint: Intermittent Routing Failure and High Latency".to_string());
    lines.push(String::new());
    lines.push(format!(
        "To {} Technical Support / Network Engineering,",
        options.provider
    ));
    lines.push(String::new());
    lines.push(format!(
        "I have completed an automated {}-hour network performance test of my \
         internet connection. The results indicate that the local access line and \
         customer premises equipment are functioning correctly. However, the data \
         shows repeated routing instability and latency issues within the upstream network.",
        observation_hours(report)
    ));
    lines.push(String::new());

    lines.push("1. SPEED PERFORMANCE:".to_string());
    lines.push(format!("   - Average observed download speed: {} Mbps", avg_speed));
    lines.push(format!("   - Subscribed plan speed: {} Mbps", options.plan_speed_mbps));
    lines.push(String::new());

    lines.push("2. ROUTING AND LATENCY ISSUES (PRIMARY CAUSE):".to_string());
    match &report.routes {
        Some(routes) if !routes.is_single_route() => {
            lines.push(format!(
                "   - Traffic routed via '{}' shows stable latency.",
                routes.best.server
            ));
            lines.push(format!(
                "   - Traffic routed via '{}' shows latency spikes up to {:.1} ms.",
                routes.worst.server, routes.worst.max_latency_ms
            ));
        }
        _ => {
            lines.push(format!(
                "   - Latency spikes up to {} ms observed consistently.",
                peak_latency
            ));
        }
    }

    let hops = &report.traceroute.lossy_hops;
    if !hops.is_empty() {
        lines.push(format!(
            "   - Traceroute analysis shows sustained packet loss at intermediate hops ({}).",
            hops
        ));
        let local = match report.traceroute.local_hop_latency_ms {
            Some(ms) => format!("remains stable at ~{:.0} ms", ms),
            None => "remains stable".to_string(),
        };
        lines.push(format!(
            "   - Hop 1 (local router) {}, confirming the issue is beyond the local network.",
            local
        ));
    }

    if !report.outages.is_empty() {
        lines.push(String::new());
        lines.push("3. SERVICE INSTABILITY (PARTIAL SERVICE OUTAGES):".to_string());
        lines.push(format!(
            "   The connection experienced {} extended incidents where the link remained active, \
             but traffic forwarding failed for more than {} minutes:",
            report.outages.len(),
            report.outage_threshold_minutes
        ));
        for outage in &report.outages {
            lines.push(format!(
                "   - {} (Duration: {} minutes)",
                outage.occurred_at, outage.duration_minutes
            ));
        }
    }

    lines.push(String::new());
    lines.push("Request:".to_string());
    lines.push(
        "Please escalate this issue to the L2 / Network Engineering team for investigation of routing, \
         capacity, or aggregation-level issues. This does not appear to be a physical line or premises issue. \
         A field technician visit is not required."
            .to_string(),
    );
    lines.push("=".repeat(RULE_WIDTH));

    lines.join("\n")
}

/// Generate JSON report
pub fn generate_json_report(report: &AuditReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Write the rendered complaint to a file
pub fn generate_text_report(report: &AuditReport, options: &ReportOptions, output_path: &Path) -> Result<()> {
    let content = render_complaint(report, options);
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Print a summary to stdout
pub fn print_summary(report: &AuditReport) {
    println!("\n=== NETWORK AUDIT SUMMARY ===\n");
    for source in &report.sources {
        match source {
            SourceReport::Loaded { path, records, rejected_rows } => {
                println!("Source {}: {} records, {} rejected rows", path.display(), records, rejected_rows)
            }
            SourceReport::Missing { path } => println!("Source {}: not found", path.display()),
            SourceReport::Malformed { path, reason } => {
                println!("Source {}: skipped ({})", path.display(), reason)
            }
        }
    }
    println!("Period: {} .. {}", report.first_record, report.last_record);
    println!(
        "Records: {} ({} valid, {} excluded, {} rate-limited dropped)",
        report.total_records, report.summary.valid_records, report.summary.excluded_records, report.blocked_records
    );
    println!("Average download: {} Mbps", format_value(report.summary.average_download_mbps));
    println!("Peak latency: {} ms", format_value(report.summary.peak_latency_ms));

    if let Some(ref routes) = report.routes {
        println!("\nRoutes:");
        for route in &routes.routes {
            println!("  {}: max {:.1} ms", route.server, route.max_latency_ms);
        }
    }

    println!(
        "\nOutages over {} minutes: {}",
        report.outage_threshold_minutes,
        report.outages.len()
    );
    if !report.traceroute.lossy_hops.is_empty() {
        println!("Packet loss: {}", report.traceroute.lossy_hops);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::BTreeSet;

    fn ts(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn options() -> ReportOptions {
        ReportOptions {
            plan_speed_mbps: 100.0,
            provider: "ACT".to_string(),
        }
    }

    fn sample_report() -> AuditReport {
        AuditReport {
            sources: Vec::new(),
            total_records: 40,
            blocked_records: 3,
            first_record: ts(0, 0),
            last_record: ts(23, 50),
            outage_threshold_minutes: 45,
            summary: SummaryStats {
                valid_records: 36,
                excluded_records: 4,
                average_download_mbps: Some(62.345),
                peak_latency_ms: Some(412.0),
            },
            routes: Some(RouteSummary {
                routes: vec![
                    RouteStatistic { server: "Chennai".into(), max_latency_ms: 412.0 },
                    RouteStatistic { server: "Mumbai".into(), max_latency_ms: 38.5 },
                ],
                best: RouteStatistic { server: "Mumbai".into(), max_latency_ms: 38.5 },
                worst: RouteStatistic { server: "Chennai".into(), max_latency_ms: 412.0 },
            }),
            outages: vec![OutageEvent {
                occurred_at: ts(14, 30),
                duration_minutes: 95,
            }],
            traceroute: TracerouteSummary {
                lossy_hops: HopLossSet(BTreeSet::from([5, 7])),
                local_hop_latency_ms: Some(2.1),
            },
        }
    }

    #[test]
    fn test_render_full_complaint() {
        let text = render_complaint(&sample_report(), &options());
        assert!(text.contains("Average Download Speed: 62.3 Mbps"));
        assert!(text.contains("To ACT Technical Support"));
        assert!(text.contains("automated 24-hour network performance test"));
        assert!(text.contains("Subscribed plan speed: 100 Mbps"));
        assert!(text.contains("Traffic routed via 'Mumbai' shows stable latency."));
        assert!(text.contains("Traffic routed via 'Chennai' shows latency spikes up to 412.0 ms."));
        assert!(text.contains("intermediate hops (Hops 5, 7)"));
        assert!(text.contains("remains stable at ~2 ms"));
        assert!(text.contains("experienced 1 extended incidents"));
        assert!(text.contains("   - 2024-03-05 14:30:00 (Duration: 95 minutes)"));
        assert!(text.ends_with(&"=".repeat(RULE_WIDTH)));
    }

    #[test]
    fn test_render_single_route_without_extras() {
        let mut report = sample_report();
        report.routes = Some(RouteSummary {
            routes: vec![RouteStatistic { server: "Mumbai".into(), max_latency_ms: 412.0 }],
            best: RouteStatistic { server: "Mumbai".into(), max_latency_ms: 412.0 },
            worst: RouteStatistic { server: "Mumbai".into(), max_latency_ms: 412.0 },
        });
        report.outages.clear();
        report.traceroute = TracerouteSummary::default();

        let text = render_complaint(&report, &options());
        assert!(text.contains("Latency spikes up to 412.0 ms observed consistently."));
        assert!(!text.contains("Traffic routed via"));
        assert!(!text.contains("Traceroute analysis"));
        assert!(!text.contains("SERVICE INSTABILITY"));
        assert!(text.contains("Request:"));
    }

    #[test]
    fn test_missing_statistics_render_as_na() {
        let mut report = sample_report();
        report.summary.average_download_mbps = None;
        report.summary.peak_latency_ms = None;
        report.routes = None;

        let text = render_complaint(&report, &options());
        assert!(text.contains("Average Download Speed: n/a Mbps"));
        assert!(text.contains("Latency spikes up to n/a ms observed consistently."));
    }

    #[test]
    fn test_json_report_exposes_entities() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        generate_json_report(&sample_report(), &path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["outages"][0]["duration_minutes"], 95);
        assert_eq!(value["outages"][0]["occurred_at"], "2024-03-05T14:30:00");
        assert_eq!(value["traceroute"]["lossy_hops"], serde_json::json!([5, 7]));
        assert_eq!(value["routes"]["worst"]["server"], "Chennai");
    }
}
