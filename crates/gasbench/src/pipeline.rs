//! End-to-end run: trials, aggregation, gate, persistence.

use std::path::PathBuf;

use gasbench_table::{SummaryTable, aggregate};
use tracing::{info, info_span, warn};

use crate::config::HarnessConfig;
use crate::gate::{GateVerdict, gate};
use crate::orchestrator::{Orchestrator, TrialObserver};
use crate::process::ProcessRunner;
use crate::registry::Registry;
use crate::revision::RevisionId;
use crate::store::ResultStore;
use crate::Result;

/// Outcome of a completed pipeline.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub revision: RevisionId,
    pub summary: SummaryTable,
    pub verdict: GateVerdict,
    /// Record path. `None` when the gate failed and nothing was stored.
    pub persisted: Option<PathBuf>,
}

impl PipelineReport {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.verdict.passed()
    }
}

/// Run every trial, aggregate, gate, and persist on a pass.
///
/// Any trial or aggregation error aborts before the gate, so a partial run
/// never reaches the store. A failed gate is reported in the returned
/// verdict rather than as an error.
pub fn run_pipeline(
    config: &HarnessConfig,
    runner: &dyn ProcessRunner,
    revision: &RevisionId,
    observer: &dyn TrialObserver,
) -> Result<PipelineReport> {
    let _span = info_span!("pipeline", revision = %revision).entered();
    config.validate()?;
    let registry = Registry::from_config(&config.workloads, &config.inputs_dir())?;
    let interval = config.gate.interval()?;
    let selector = config.gate.selector();

    let tables = Orchestrator::new(runner, config).run_trials(
        &registry,
        config.trials,
        revision,
        observer,
    )?;

    let summary = aggregate(&tables, &config.metric_column, &config.key_columns)?;
    info!(rows = summary.len(), trials = tables.len(), "aggregated");
    let key = config.key_columns.resolve(summary.header())?;
    crate::metrics::record_summary(&summary, &key);

    let verdict = gate(&summary, &selector, config.gate.statistic, interval)?;
    crate::metrics::record_gate(config.gate.statistic.as_str(), verdict.value(), verdict.passed());

    let persisted = if verdict.passed() {
        Some(ResultStore::new(config.store_dir()).persist(revision, &summary)?)
    } else {
        warn!("gate failed, summary not persisted");
        None
    };

    Ok(PipelineReport {
        revision: revision.clone(),
        summary,
        verdict,
        persisted,
    })
}
