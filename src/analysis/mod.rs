//! Measurement reconciliation and anomaly detection.
//!
//! Merges speed-test reports, classifies samples, and derives the outage,
//! route and packet-loss evidence that the complaint report is built from.

pub mod types;
pub mod error;
pub mod schema;
pub mod merge;
pub mod validity;
pub mod outage;
pub mod traceroute;
pub mod routes;
pub mod pipeline;
pub mod report;

pub use types::*;
pub use error::{FieldError, SchemaError};
pub use schema::{load_source, ColumnAliases, DateOrder, SourceOutcome};
pub use merge::{merge_sources, MergedSeries};
pub use outage::OutageDetector;
pub use traceroute::load_traceroute;
pub use pipeline::{analyze_series, run_audit};
pub use report::{generate_json_report, generate_text_report, render_complaint, ReportOptions};
