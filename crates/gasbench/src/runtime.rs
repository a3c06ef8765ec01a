//! Execution adapter: runs the benchmark runtime once per trial and reads
//! back the table it writes.

use std::path::PathBuf;
use std::time::Instant;

use gasbench_table::RawMetricsTable;
use tracing::{debug, info_span};

use crate::config::{CommandTemplate, HarnessConfig, expand};
use crate::process::{ProcessRunner, remove_if_exists};
use crate::revision::RevisionId;
use crate::{Error, Result};

/// Environment variable carrying the revision id to the runtime.
pub const REVISION_ENV: &str = "GASBENCH_REVISION";

/// Invokes the runtime over every staged artifact.
pub struct Runtime<'a> {
    runner: &'a dyn ProcessRunner,
    command: CommandTemplate,
    dir: PathBuf,
    output: String,
}

impl<'a> Runtime<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, config: &HarnessConfig) -> Self {
        Self {
            runner,
            command: config.runtime.clone(),
            dir: config.runtime_dir(),
            output: config.runtime_output.clone(),
        }
    }

    /// The runtime's working directory (also the staging directory).
    #[must_use]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Where the runtime writes its table for `revision`.
    #[must_use]
    pub fn output_path(&self, revision: &RevisionId) -> PathBuf {
        self.dir
            .join(expand(&self.output, &[("revision", revision.as_str())]))
    }

    /// Run the runtime and parse its output table.
    ///
    /// A non-zero exit invalidates the trial even if a table was written.
    pub fn execute(&self, revision: &RevisionId) -> Result<RawMetricsTable> {
        let _span = info_span!("execute", revision = %revision).entered();
        let output = self.output_path(revision);
        // A leftover table from an earlier trial must not be mistaken for this one.
        remove_if_exists(&output)?;

        let command = self
            .command
            .render(&self.dir, &[("revision", revision.as_str())])
            .env(REVISION_ENV, revision.as_str());

        let start = Instant::now();
        let report = self.runner.run(&command)?.check_timeout(&command)?;
        crate::metrics::record_execute(start.elapsed());

        if !report.outcome.success() {
            return Err(Error::Execution {
                outcome: report.outcome,
                stderr: report.stderr,
            });
        }

        let table = RawMetricsTable::from_path(&output)?;
        debug!(rows = table.len(), output = %output.display(), "runtime finished");
        Ok(table)
    }
}
