//! End-to-end audit: load, merge, classify, detect, aggregate.

use color_eyre::eyre::Result;

use super::merge::{merge_sources, MergedSeries};
use super::outage::OutageDetector;
use super::routes::summarize_routes;
use super::schema::load_source;
use super::traceroute::load_traceroute;
use super::types::{AuditOutcome, AuditReport, TracerouteSummary};
use super::validity::{classify, summarize};
use crate::config::AuditConfig;

/// Derive every statistic from an already merged series.
///
/// Returns `None` for an empty series. Pure: identical inputs give identical reports.
pub fn analyze_series(
    series: &MergedSeries,
    detector: &OutageDetector,
    traceroute: TracerouteSummary,
) -> Option<AuditReport> {
    let first = series.records.first()?;
    let last = series.records.last()?;

    let classified = classify(&series.records);
    let summary = summarize(&classified);
    let routes = summarize_routes(classified.valid.iter().copied());
    let outages = detector.detect(&series.records);

    Some(AuditReport {
        sources: series.sources.clone(),
        total_records: series.len(),
        blocked_records: series.blocked,
        first_record: first.timestamp,
        last_record: last.timestamp,
        outage_threshold_minutes: detector.threshold().num_minutes(),
        summary,
        routes,
        outages,
        traceroute,
    })
}

/// Load every configured source and the traceroute log, then analyze.
///
/// Unreadable sources are skipped; only the absence of any record at all
/// changes the outcome, to [`AuditOutcome::NoData`].
pub fn run_audit(config: &AuditConfig) -> Result<AuditOutcome> {
    log::info!("Loading {} measurement sources...", config.sources.len());

    let outcomes = config
        .sources
        .iter()
        .map(|source| load_source(&source.path, &source.column_aliases(), config.date_order))
        .collect();
    let series = merge_sources(outcomes);

    if series.is_empty() {
        log::warn!("No usable measurement records in any source");
        return Ok(AuditOutcome::NoData {
            sources: series.sources,
        });
    }

    let traceroute = match load_traceroute(&config.traceroute) {
        Ok(summary) => summary,
        Err(e) => {
            log::warn!("Ignoring traceroute log: {:#}", e);
            TracerouteSummary::default()
        }
    };

    let detector = config.outage_detector();
    let Some(report) = analyze_series(&series, &detector, traceroute) else {
        return Ok(AuditOutcome::NoData {
            sources: series.sources,
        });
    };

    log::info!(
        "Analyzed {} records: {} valid, {} excluded, {} outages",
        report.total_records,
        report.summary.valid_records,
        report.summary.excluded_records,
        report.outages.len()
    );

    Ok(AuditOutcome::Complete(report))
}
