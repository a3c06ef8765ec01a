//! Trial orchestrator: build, stage, execute and clean, N times in a row.
//!
//! Trials share the staging directory and fixed artifact names, so they run
//! strictly one after another. The first failure aborts the whole run and
//! every table collected so far is dropped.

use gasbench_table::{ColumnRef, KeyColumns, RawMetricsTable, check_row_identity, check_workloads};
use tracing::{debug, info, info_span};

use crate::compiler::{Artifact, Compiler};
use crate::config::HarnessConfig;
use crate::process::ProcessRunner;
use crate::registry::{Registry, Workload};
use crate::revision::RevisionId;
use crate::runtime::Runtime;
use crate::staging::Staging;
use crate::{Error, Result};

/// Progress hooks. Every method defaults to a no-op.
pub trait TrialObserver {
    fn trial_started(&self, _trial: usize, _total: usize) {}
    fn workload_built(&self, _trial: usize, _workload: &Workload) {}
    fn executing(&self, _trial: usize) {}
    fn trial_finished(&self, _trial: usize, _rows: usize) {}
}

/// Observer that ignores everything.
pub struct Quiet;

impl TrialObserver for Quiet {}

/// Drives the build and execution adapters over a fixed trial count.
pub struct Orchestrator<'a> {
    compiler: Compiler<'a>,
    runtime: Runtime<'a>,
    staging: Staging,
    key: KeyColumns,
    workload_column: ColumnRef,
}

impl<'a> Orchestrator<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, config: &HarnessConfig) -> Self {
        let runtime = Runtime::new(runner, config);
        let staging = Staging::new(runtime.dir());
        Self {
            compiler: Compiler::new(runner, config),
            runtime,
            staging,
            key: config.key_columns.clone(),
            workload_column: config.workload_column.clone(),
        }
    }

    /// Run `trials` trials over `registry`, returning one table per trial in order.
    ///
    /// Every returned table has the same header, row count and row identity
    /// as the first, and the first reports exactly the registry's workloads.
    pub fn run_trials(
        &self,
        registry: &Registry,
        trials: usize,
        revision: &RevisionId,
        observer: &dyn TrialObserver,
    ) -> Result<Vec<RawMetricsTable>> {
        if trials == 0 {
            return Err(Error::Config("trials must be at least 1".to_string()));
        }

        info!(trials, workloads = registry.len(), %revision, "starting trials");
        let mut tables: Vec<RawMetricsTable> = Vec::with_capacity(trials);
        for trial in 0..trials {
            let _span = info_span!("trial", trial).entered();
            observer.trial_started(trial, trials);

            let table = self
                .run_trial(registry, trial, revision, observer)
                .map_err(|e| e.in_trial(trial))?;

            if let Some(reference) = tables.first() {
                let key = self.key.resolve(reference.header())?;
                check_row_identity(reference, &table, trial, &key)?;
            } else {
                let column = self.workload_column.resolve(table.header())?;
                let names: Vec<&str> = registry.iter().map(Workload::name).collect();
                check_workloads(&table, column, &names)?;
            }

            crate::metrics::record_trial();
            observer.trial_finished(trial, table.len());
            debug!(trial, rows = table.len(), "trial complete");
            tables.push(table);
        }
        Ok(tables)
    }

    fn run_trial(
        &self,
        registry: &Registry,
        trial: usize,
        revision: &RevisionId,
        observer: &dyn TrialObserver,
    ) -> Result<RawMetricsTable> {
        let names = self.artifact_names(registry);
        self.clean(registry, &names)?;

        let result = self.build_and_execute(registry, trial, revision, observer);
        // Clean on failure too; the trial's own error wins over a cleanup error.
        let cleaned = self.clean(registry, &names);
        let table = result?;
        cleaned?;
        Ok(table)
    }

    fn build_and_execute(
        &self,
        registry: &Registry,
        trial: usize,
        revision: &RevisionId,
        observer: &dyn TrialObserver,
    ) -> Result<RawMetricsTable> {
        let mut artifacts: Vec<Artifact> = Vec::with_capacity(registry.len());
        for workload in registry {
            artifacts.push(self.compiler.build(workload)?);
            observer.workload_built(trial, workload);
        }
        for artifact in &artifacts {
            self.staging.stage(artifact)?;
        }

        observer.executing(trial);
        self.runtime.execute(revision)
    }

    fn artifact_names(&self, registry: &Registry) -> Vec<std::ffi::OsString> {
        registry
            .iter()
            .filter_map(|w| {
                self.compiler
                    .artifact_relative(w)
                    .file_name()
                    .map(ToOwned::to_owned)
            })
            .collect()
    }

    /// Remove staged copies and build outputs of every workload.
    fn clean(&self, registry: &Registry, names: &[std::ffi::OsString]) -> Result<()> {
        self.staging.clean(names)?;
        for workload in registry {
            crate::process::remove_if_exists(&self.compiler.artifact_path(workload))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandSpec, ProcessReport};
    use crate::runtime::REVISION_ENV;
    use std::cell::Cell;
    use std::path::Path;

    /// Compiler writes `-o` artifacts; runtime writes one row per staged artifact.
    struct Scripted {
        metric: Cell<u32>,
        fail_build_in_trial: Option<u32>,
        executions: Cell<u32>,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                metric: Cell::new(250),
                fail_build_in_trial: None,
                executions: Cell::new(0),
            }
        }
    }

    impl ProcessRunner for Scripted {
        fn run(&self, command: &CommandSpec) -> Result<ProcessReport> {
            if let Some(out) = command.arg_after("-o") {
                if self.fail_build_in_trial == Some(self.executions.get()) {
                    return Ok(ProcessReport::exited(1));
                }
                std::fs::write(command.working_dir.join(out), b"\0asm")?;
                return Ok(ProcessReport::exited(0));
            }

            let revision = command
                .env
                .iter()
                .find(|(k, _)| k == REVISION_ENV)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            let mut staged: Vec<String> = std::fs::read_dir(&command.working_dir)?
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter_map(|n| n.strip_suffix(".wasm").map(String::from))
                .collect();
            staged.sort();

            let mut body = String::from("Commit,Contract,Method,Input,Tgas burned,Avg Tgas used\n");
            for name in staged {
                body.push_str(&format!("{revision},{name},run,{{}},3,{}\n", self.metric.get()));
            }
            self.metric.set(self.metric.get() + 2);
            self.executions.set(self.executions.get() + 1);

            let csvs = command.working_dir.join("csvs");
            std::fs::create_dir_all(&csvs)?;
            std::fs::write(csvs.join(format!("{revision}.csv")), body)?;
            Ok(ProcessReport::exited(0))
        }
    }

    fn config(root: &Path) -> HarnessConfig {
        std::fs::create_dir_all(root.join("tools/benchmark")).unwrap();
        HarnessConfig {
            project_root: root.to_path_buf(),
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn test_tables_per_trial_and_cleanup() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        let runner = Scripted::new();
        let registry = Registry::from_names(["calc", "const"]).unwrap();
        let revision = RevisionId::parse("abc1234").unwrap();

        let tables = Orchestrator::new(&runner, &config)
            .run_trials(&registry, 3, &revision, &Quiet)
            .unwrap();

        assert_eq!(tables.len(), 3);
        let metrics: Vec<_> = tables.iter().map(|t| t.cell(0, 5).unwrap()).collect();
        assert_eq!(metrics, ["250", "252", "254"]);
        assert_eq!(tables[0].cell(1, 1), Some("const"));

        // Nothing left in the staging area or the project root.
        assert!(!root.path().join("tools/benchmark/calc.wasm").exists());
        assert!(!root.path().join("calc.wasm").exists());
    }

    #[test]
    fn test_zero_trials_rejected() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        let runner = Scripted::new();
        let registry = Registry::from_names(["calc"]).unwrap();
        let revision = RevisionId::parse("abc1234").unwrap();

        let err = Orchestrator::new(&runner, &config)
            .run_trials(&registry, 0, &revision, &Quiet)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(runner.executions.get(), 0);
    }

    #[test]
    fn test_build_failure_aborts_with_trial_index() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        let runner = Scripted {
            fail_build_in_trial: Some(2),
            ..Scripted::new()
        };
        let registry = Registry::from_names(["calc"]).unwrap();
        let revision = RevisionId::parse("abc1234").unwrap();

        let err = Orchestrator::new(&runner, &config)
            .run_trials(&registry, 10, &revision, &Quiet)
            .unwrap_err();

        let Error::Trial { trial, source } = err else {
            panic!("expected a trial error");
        };
        assert_eq!(trial, 2);
        assert!(matches!(*source, Error::Build { .. }));
        assert_eq!(runner.executions.get(), 2, "no execution after the failed build");
    }
}
