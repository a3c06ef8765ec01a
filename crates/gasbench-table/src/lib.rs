//! Metrics tables and cross-trial aggregation for gasbench.
//!
//! A benchmark runtime emits one [`RawMetricsTable`] per trial. [`aggregate`]
//! reduces a set of them into a [`SummaryTable`] holding the mean, sample
//! variance, min and max of one metric column for every row.

mod aggregate;
mod column;
mod stats;
mod table;

pub use aggregate::{aggregate, check_row_identity, check_workloads};
pub use column::{ColumnRef, KeyColumns};
pub use stats::{SampleStats, format_value};
pub use table::{RawMetricsTable, SummaryRow, SummaryTable, SUMMARY_COLUMNS};

use thiserror::Error;

/// Table and aggregation errors.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("row {row} has {found} cells, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("trial {trial} does not match trial 0: {detail}")]
    ShapeMismatch { trial: usize, detail: String },
    #[error("workload column disagrees with the registry: missing [{}], unexpected [{}]", .missing.join(","), .unexpected.join(","))]
    WorkloadMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    #[error("unknown column {column} (header: {header})")]
    UnknownColumn { column: String, header: String },
    #[error("metric column {0} cannot also be a key column")]
    MetricInKey(String),
    #[error("trial {trial}, row {row}: metric value `{value}` is not a number")]
    InvalidMetric {
        trial: usize,
        row: usize,
        value: String,
    },
    #[error("no trials to aggregate")]
    NoTrials,
    #[error("not a summary table: {0}")]
    NotASummary(String),
}

pub type Result<T> = std::result::Result<T, TableError>;
