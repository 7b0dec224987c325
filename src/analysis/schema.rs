//! Schema normalization for speed-test reports.
//!
//! Collector versions disagree on header spelling (`Timestamp_IST` vs
//! `Timestamp_UTC`, `ISP` vs `ISP_Name`, ...) and on timestamp layout. Every
//! source is mapped onto [`MeasurementRecord`] here before merging.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{FieldError, SchemaError};
use super::types::{MeasurementRecord, SourceReport, Status};

/// Fields of the canonical measurement schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Timestamp,
    Server,
    IspName,
    DownloadMbps,
    MaxLatencyMs,
    MinLatencyMs,
    LossPct,
    Status,
}

/// Built-in header spellings seen across collector versions.
const DEFAULT_ALIASES: &[(&str, CanonicalField)] = &[
    ("timestamp", CanonicalField::Timestamp),
    ("timestamp_ist", CanonicalField::Timestamp),
    ("timestamp_utc", CanonicalField::Timestamp),
    ("timestamp_local", CanonicalField::Timestamp),
    ("local_time", CanonicalField::Timestamp),
    ("utc_time", CanonicalField::Timestamp),
    ("datetime", CanonicalField::Timestamp),
    ("server", CanonicalField::Server),
    ("server_name", CanonicalField::Server),
    ("isp", CanonicalField::IspName),
    ("isp_name", CanonicalField::IspName),
    ("download_mbps", CanonicalField::DownloadMbps),
    ("download", CanonicalField::DownloadMbps),
    ("max_lat", CanonicalField::MaxLatencyMs),
    ("max_latency", CanonicalField::MaxLatencyMs),
    ("max_latency_ms", CanonicalField::MaxLatencyMs),
    ("min_lat", CanonicalField::MinLatencyMs),
    ("min_latency", CanonicalField::MinLatencyMs),
    ("min_latency_ms", CanonicalField::MinLatencyMs),
    ("loss_pct", CanonicalField::LossPct),
    ("packet_loss", CanonicalField::LossPct),
    ("status", CanonicalField::Status),
];

fn alias_key(header: &str) -> String {
    header.trim().to_ascii_lowercase()
}

/// Immutable header → canonical field lookup.
///
/// Keys are matched after trimming and lowercasing, so `" Timestamp_IST"` and
/// `"timestamp_ist"` resolve identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAliases {
    map: HashMap<String, CanonicalField>,
}

impl ColumnAliases {
    /// A table that maps nothing.
    pub fn empty() -> Self {
        Self { map: HashMap::new() }
    }

    /// Return a copy with one more alias; later aliases override earlier ones.
    pub fn with_alias(mut self, alias: &str, field: CanonicalField) -> Self {
        self.map.insert(alias_key(alias), field);
        self
    }

    /// Return a copy extended with per-source aliases.
    pub fn extended(&self, extra: &BTreeMap<String, CanonicalField>) -> Self {
        extra
            .iter()
            .fold(self.clone(), |aliases, (alias, field)| aliases.with_alias(alias, *field))
    }

    pub fn resolve(&self, header: &str) -> Option<CanonicalField> {
        self.map.get(&alias_key(header)).copied()
    }
}

impl Default for ColumnAliases {
    fn default() -> Self {
        DEFAULT_ALIASES
            .iter()
            .fold(Self::empty(), |aliases, (alias, field)| aliases.with_alias(alias, *field))
    }
}

/// How to read dates such as `03/04/2024` where day and month can be swapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// Prefer month first, fall back to day first when that is the only valid reading
    #[default]
    MonthFirst,
    /// Prefer day first, fall back to month first
    DayFirst,
    /// Reject dates whose two readings are both valid and differ
    Strict,
}

/// Year-first layouts, tried before anything ambiguous.
const YEAR_FIRST_DATES: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Separators for day/month/year layouts.
const DMY_SEPARATORS: &[char] = &['/', '-', '.'];

/// Compiled regex patterns for the date part of a timestamp
pub struct DatePatterns {
    /// Match: "2024-03-05..." or "2024/03/05..." with a four-digit year
    pub year_first: Regex,
    /// Match: "05/03/2024...", "5-3-2024...", "05.03.2024..." with a four-digit year
    pub day_month: Regex,
}

impl DatePatterns {
    pub fn new() -> Self {
        Self {
            year_first: Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}(?:[ T]|$)")
                .expect("Invalid year_first regex"),
            day_month: Regex::new(r"^\d{1,2}[/.-]\d{1,2}[/.-]\d{4}(?:[ T]|$)")
                .expect("Invalid day_month regex"),
        }
    }
}

impl Default for DatePatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global patterns instance
pub static DATE_PATTERNS: LazyLock<DatePatterns> = LazyLock::new(DatePatterns::new);

/// Time-of-day suffixes appended to each date layout.
const TIME_SUFFIXES: &[&str] = &[
    " %H:%M:%S%.f",
    "T%H:%M:%S%.f",
    " %H:%M",
    "T%H:%M",
    " %I:%M:%S %p",
    " %I:%M %p",
];

/// Try one date layout with every time suffix, then as a bare date (midnight).
fn parse_with_date_format(text: &str, date_format: &str) -> Option<NaiveDateTime> {
    for suffix in TIME_SUFFIXES {
        let format = format!("{}{}", date_format, suffix);
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, &format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, date_format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn parse_day_month(text: &str, order: DateOrder) -> Result<Option<NaiveDateTime>, FieldError> {
    for sep in DMY_SEPARATORS {
        let month_first = parse_with_date_format(text, &format!("%m{sep}%d{sep}%Y"));
        let day_first = parse_with_date_format(text, &format!("%d{sep}%m{sep}%Y"));

        let chosen = match (month_first, day_first) {
            (None, None) => continue,
            (Some(m), None) => m,
            (None, Some(d)) => d,
            (Some(m), Some(d)) => match order {
                DateOrder::Strict if m != d => {
                    return Err(FieldError::AmbiguousTimestamp(text.to_string()))
                }
                DateOrder::MonthFirst | DateOrder::Strict => m,
                DateOrder::DayFirst => d,
            },
        };
        return Ok(Some(chosen));
    }
    Ok(None)
}

/// Parse a timestamp written in any of the layouts collectors have produced.
///
/// Attempts run in a fixed order: year-first layouts, RFC 3339 (offset
/// dropped, wall time kept), then day/month layouts resolved by `order`.
/// Date layouts are only tried when the year has four digits, since chrono's
/// `%Y` would read `24` as year 24. Text matching none of them is an error,
/// never a default.
pub fn parse_timestamp(raw: &str, order: DateOrder) -> Result<NaiveDateTime, FieldError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(FieldError::MissingTimestamp);
    }

    if DATE_PATTERNS.year_first.is_match(text) {
        for date_format in YEAR_FIRST_DATES {
            if let Some(dt) = parse_with_date_format(text, date_format) {
                return Ok(dt);
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_local());
    }

    if DATE_PATTERNS.day_month.is_match(text) {
        if let Some(dt) = parse_day_month(text, order)? {
            return Ok(dt);
        }
    }

    Err(FieldError::UnparsableTimestamp(text.to_string()))
}

/// Numeric coercion: anything that is not a finite number is missing.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_text(raw: &str) -> Option<String> {
    let text = raw.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Column positions of one source after alias resolution.
#[derive(Debug, Clone)]
struct HeaderLayout {
    names: Vec<String>,
    fields: Vec<Option<CanonicalField>>,
}

impl HeaderLayout {
    fn resolve(headers: &StringRecord, aliases: &ColumnAliases) -> Self {
        let mut names = Vec::with_capacity(headers.len());
        let mut fields: Vec<Option<CanonicalField>> = Vec::with_capacity(headers.len());

        for header in headers.iter() {
            let name = header.trim().to_string();
            let field = match aliases.resolve(&name) {
                Some(field) if fields.contains(&Some(field)) => {
                    log::debug!("Column '{}' duplicates {:?}, keeping it as a plain column", name, field);
                    None
                }
                other => other,
            };
            names.push(name);
            fields.push(field);
        }

        Self { names, fields }
    }

    fn index_of(&self, field: CanonicalField) -> Option<usize> {
        self.fields.iter().position(|f| *f == Some(field))
    }

    fn build_record(&self, row: &StringRecord, order: DateOrder) -> Result<MeasurementRecord, FieldError> {
        let timestamp_raw = self
            .index_of(CanonicalField::Timestamp)
            .and_then(|i| row.get(i))
            .unwrap_or("");
        let timestamp = parse_timestamp(timestamp_raw, order)?;

        let mut record = MeasurementRecord::new(timestamp, Status::Unknown);
        for (i, value) in row.iter().enumerate() {
            match self.fields.get(i).copied().flatten() {
                Some(CanonicalField::Timestamp) => {}
                Some(CanonicalField::Server) => record.server = parse_text(value),
                Some(CanonicalField::IspName) => record.isp_name = parse_text(value),
                Some(CanonicalField::DownloadMbps) => record.download_mbps = parse_numeric(value),
                Some(CanonicalField::MaxLatencyMs) => record.max_latency_ms = parse_numeric(value),
                Some(CanonicalField::MinLatencyMs) => record.min_latency_ms = parse_numeric(value),
                Some(CanonicalField::LossPct) => record.loss_pct = parse_numeric(value),
                Some(CanonicalField::Status) => record.status = Status::parse(value),
                None => {
                    if let Some(name) = self.names.get(i) {
                        record.extra.insert(name.clone(), value.to_string());
                    }
                }
            }
        }
        Ok(record)
    }
}

/// A row dropped because its timestamp could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based line in the source file
    pub line: u64,
    pub error: FieldError,
}

/// Records normalized from one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<MeasurementRecord>,
    pub rejected: Vec<RejectedRow>,
}

/// Normalize delimited text with a header row.
///
/// Short rows (a partially written last line) keep their present fields and
/// read the rest as missing; rows longer than the header make the source malformed.
pub fn normalize_reader<R: Read>(
    reader: R,
    aliases: &ColumnAliases,
    order: DateOrder,
) -> Result<NormalizedBatch, SchemaError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let layout = HeaderLayout::resolve(&headers, aliases);

    if layout.index_of(CanonicalField::Timestamp).is_none() {
        return Err(SchemaError::MissingTimestampColumn(layout.names.join(", ")));
    }

    let mut batch = NormalizedBatch::default();
    for row in csv_reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        if row.len() > layout.names.len() {
            return Err(SchemaError::ExtraFields {
                line,
                expected: layout.names.len(),
                found: row.len(),
            });
        }
        match layout.build_record(&row, order) {
            Ok(record) => batch.records.push(record),
            Err(error) => batch.rejected.push(RejectedRow { line, error }),
        }
    }

    Ok(batch)
}

/// What loading one source produced.
#[derive(Debug)]
pub enum SourceOutcome {
    Loaded { path: PathBuf, batch: NormalizedBatch },
    SkippedMissing(PathBuf),
    SkippedMalformed { path: PathBuf, error: SchemaError },
}

impl SourceOutcome {
    pub fn report(&self) -> SourceReport {
        match self {
            SourceOutcome::Loaded { path, batch } => SourceReport::Loaded {
                path: path.clone(),
                records: batch.records.len(),
                rejected_rows: batch.rejected.len(),
            },
            SourceOutcome::SkippedMissing(path) => SourceReport::Missing { path: path.clone() },
            SourceOutcome::SkippedMalformed { path, error } => SourceReport::Malformed {
                path: path.clone(),
                reason: error.to_string(),
            },
        }
    }
}

/// Load and normalize one report file. Never fails: problems become skip outcomes.
pub fn load_source(path: &Path, aliases: &ColumnAliases, order: DateOrder) -> SourceOutcome {
    if !path.exists() {
        log::debug!("No source file at {}, skipping", path.display());
        return SourceOutcome::SkippedMissing(path.to_path_buf());
    }

    let result = fs::read(path)
        .map_err(SchemaError::from)
        .and_then(|bytes| normalize_reader(bytes.as_slice(), aliases, order));

    match result {
        Ok(batch) => {
            for rejected in &batch.rejected {
                log::warn!("{}:{}: dropping row: {}", path.display(), rejected.line, rejected.error);
            }
            log::info!(
                "Loaded {} records from {} ({} rows rejected)",
                batch.records.len(),
                path.display(),
                batch.rejected.len()
            );
            SourceOutcome::Loaded {
                path: path.to_path_buf(),
                batch,
            }
        }
        Err(error) => {
            log::warn!("Skipping malformed source {}: {}", path.display(), error);
            SourceOutcome::SkippedMalformed {
                path: path.to_path_buf(),
                error,
            }
        }
    }
}
