//! Gas regression harness.
//!
//! Compiles a fixed set of contracts, runs the benchmark runtime over them
//! for a number of trials, reduces the per-trial tables to one summary and
//! gates a single statistic against a fixed interval. Passing summaries are
//! stored per revision.
//!
//! ```text
//! Registry -> Orchestrator (Compiler, Staging, Runtime) x N
//!          -> aggregate -> gate -> ResultStore
//! ```

pub mod compare;
pub mod compiler;
pub mod config;
mod error;
pub mod gate;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod process;
pub mod registry;
pub mod revision;
pub mod runtime;
pub mod staging;
pub mod store;
pub mod symbolize;

pub use error::{Error, Result};
pub use gasbench_table::{
    ColumnRef, KeyColumns, RawMetricsTable, SampleStats, SummaryRow, SummaryTable, TableError,
    format_value,
};

pub use compiler::{Artifact, Compiler};
pub use config::HarnessConfig;
pub use gate::{AcceptanceInterval, GateVerdict, RowSelector, Statistic, gate};
pub use orchestrator::{Orchestrator, Quiet, TrialObserver};
pub use pipeline::{PipelineReport, run_pipeline};
pub use process::{CommandSpec, Outcome, ProcessReport, ProcessRunner, SystemRunner};
pub use registry::{Registry, Workload};
pub use revision::RevisionId;
pub use runtime::Runtime;
pub use store::ResultStore;
