//! Error types for source loading and field coercion.

use thiserror::Error;

/// A source that exists but cannot be read as tabular data.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid delimited data: {0}")]
    Csv(#[from] csv::Error),
    #[error("no column maps to the timestamp field (headers: {0})")]
    MissingTimestampColumn(String),
    #[error("line {line}: expected {expected} fields, found {found}")]
    ExtraFields { line: u64, expected: usize, found: usize },
}

/// A single row whose timestamp cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("timestamp is empty")]
    MissingTimestamp,
    #[error("unparsable timestamp '{0}'")]
    UnparsableTimestamp(String),
    #[error("ambiguous timestamp '{0}' (day and month could be swapped)")]
    AmbiguousTimestamp(String),
}
