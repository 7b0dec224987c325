//! # NetAudit - Internet performance audit for ISP complaints
//!
//! This library turns the output of a periodic speed-test collector and a
//! router traceroute log into evidence an internet provider cannot dismiss:
//! average throughput against the subscribed plan, the worst routing path,
//! hops with sustained packet loss, and multi-minute outages.
//!
//! ## Pipeline
//!
//! - **Normalize** (`analysis::schema`): map each report's header spellings
//!   onto one schema, parse mixed-format timestamps, coerce numbers
//! - **Merge** (`analysis::merge`): concatenate sources, drop rate-limited
//!   samples, sort chronologically
//! - **Classify** (`analysis::validity`): failed and offline tests stay on the
//!   timeline but are left out of throughput and latency statistics
//! - **Detect** (`analysis::outage`): gaps between samples above a threshold
//! - **Trace** (`analysis::traceroute`): hops where every probe timed out
//! - **Aggregate** (`analysis::routes`): worst latency per server
//!
//! The result is an [`analysis::AuditReport`], rendered by `analysis::report`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use netaudit::analysis::{self, AuditOutcome, ReportOptions};
//! use netaudit::config_loader;
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("netaudit.yaml"))?;
//!
//! match analysis::run_audit(&config)? {
//!     AuditOutcome::Complete(report) => {
//!         println!("{}", analysis::render_complaint(&report, &ReportOptions::from(&config)));
//!     }
//!     AuditOutcome::NoData { .. } => println!("No data found."),
//! }
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! sources:
//!   - path: "network_performance_report.csv"
//!   - path: "network_report_v2.csv"
//!     aliases:
//!       Ping_Max: max_latency_ms
//! traceroute: "traceroute_logs.txt"
//! outage_threshold: "45m"
//! plan_speed_mbps: 100
//! provider: "ACT"
//! date_order: month_first
//! ```
//!
//! ## Error Handling
//!
//! Loaders and writers return `color_eyre::eyre::Result`. Per-source problems
//! never abort a run: missing and malformed reports are skipped and recorded
//! as [`analysis::SourceReport`]s, and rows with unusable timestamps are
//! dropped individually.

pub mod analysis;
pub mod config;
pub mod config_loader;
pub mod freshness;
