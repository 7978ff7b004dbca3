// Error taxonomy for the sweep pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading the sweep tables and
/// writing the heatmap.
///
/// Data-format problems carry the offending path and 1-based line so the
/// message points straight at the bad row. All of these are fatal: the
/// pipeline aborts before producing any output file.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: expected {expected} comma-separated values, found {found}", path.display())]
    RaggedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{}:{line}: invalid numeric value '{value}'", path.display())]
    BadNumber {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("{}:{line}: run id '{value}' is not a non-negative integer", path.display())]
    BadRunId {
        path: PathBuf,
        line: usize,
        value: f64,
    },

    #[error("{}: expected {expected} metric rows, found {found}", path.display())]
    MetricsShape {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("{}:{line}: {value} is not a known {parameter} value (allowed: {allowed:?})", path.display())]
    UnknownParameterValue {
        path: PathBuf,
        line: usize,
        parameter: &'static str,
        value: f64,
        allowed: [f64; 3],
    },

    #[error("metrics and parameter tables disagree on run ids: {detail}")]
    RunIdMismatch { detail: String },

    #[error("{value} is not a {parameter} sweep value (allowed: {allowed:?})")]
    NotASweepValue {
        parameter: &'static str,
        value: f64,
        allowed: [f64; 3],
    },

    #[error("no runs have {parameter} = {value}; the grid would be empty")]
    EmptySweep { parameter: &'static str, value: f64 },

    #[error("sweep layout must use each of the three parameters exactly once")]
    InvalidLayout,

    #[error("metric series has {series_len} values but the parameter table has {table_len} rows")]
    SeriesLengthMismatch {
        series_len: usize,
        table_len: usize,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("rendering failed: {0}")]
    Render(String),
}

pub type SweepResult<T> = Result<T, SweepError>;
