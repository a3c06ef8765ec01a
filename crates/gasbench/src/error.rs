use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::process::Outcome;

/// Harness errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("table error: {0}")]
    Table(#[from] gasbench_table::TableError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("build of `{workload}` failed: {outcome}{}", tail(.stderr))]
    Build {
        workload: String,
        outcome: Outcome,
        stderr: String,
    },
    #[error("build of `{workload}` succeeded but produced no artifact at {}", .path.display())]
    MissingArtifact { workload: String, path: PathBuf },
    #[error("runtime failed: {outcome}{}", tail(.stderr))]
    Execution { outcome: Outcome, stderr: String },
    #[error("`{command}` timed out after {after:?}")]
    Timeout { command: String, after: Duration },
    #[error("trial {trial}: {source}")]
    Trial {
        trial: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("no row matches {0}")]
    RowNotFound(String),
    #[error("{count} rows match {selector}, expected exactly one")]
    AmbiguousRow { selector: String, count: usize },
    #[error("{statistic} is undefined for {row} (needs at least two trials)")]
    UndefinedStatistic { statistic: String, row: String },
    #[error("regression: {statistic} of {row} is {value}, outside [{lower}, {upper}]")]
    Regression {
        statistic: String,
        row: String,
        value: f64,
        lower: f64,
        upper: f64,
    },
    #[error("invalid acceptance interval [{lower}, {upper}]")]
    InvalidInterval { lower: f64, upper: f64 },
    #[error("invalid revision: {0}")]
    Revision(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Attach the trial index to an adapter error.
    #[must_use]
    pub fn in_trial(self, trial: usize) -> Self {
        Self::Trial {
            trial,
            source: Box::new(self),
        }
    }
}

fn tail(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr.trim_end())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
