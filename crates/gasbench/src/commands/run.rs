//! The benchmark pipeline command.

use std::path::Path;

use gasbench::gate::ColumnMatch;
use gasbench::{
    ColumnRef, Error, HarnessConfig, Result, SystemRunner, revision, run_pipeline,
};
use tracing::info;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS, RunArgs};
use crate::terminal::{self, TrialProgress};

/// Handle `run` (also the default when no subcommand is given).
pub fn cmd_run(config_path: Option<&Path>, args: &RunArgs, silent: bool) -> i32 {
    let Some(mut config) = super::load_config(config_path) else {
        return EXIT_FAILURE;
    };
    if let Err(e) = apply_overrides(&mut config, args) {
        return super::fail("invalid arguments", &e);
    }

    let revision = match revision::resolve(args.revision.as_deref(), &config.project_root) {
        Ok(revision) => revision,
        Err(e) => return super::fail("cannot determine revision", &e),
    };
    info!(%revision, trials = config.trials, "benchmarking");

    let runner = SystemRunner::new()
        .with_timeout(config.timeout())
        .with_inherit_stdout(args.show_output);
    let progress = TrialProgress::new(config.trials, silent || args.show_output);

    let report = match run_pipeline(&config, &runner, &revision, &progress) {
        Ok(report) => report,
        Err(e) => {
            progress.finish();
            return super::fail("benchmark failed", &e);
        }
    };
    progress.finish();

    if !silent {
        let key = config
            .key_columns
            .resolve(report.summary.header())
            .unwrap_or_default();
        terminal::summary_table(&report.summary, &key).print();
    }

    let selector = config.gate.selector();
    match report.verdict.ensure_pass(config.gate.statistic, &selector) {
        Ok(value) => {
            terminal::success(&format!(
                "{} of {selector} is {value}, within [{}, {}]",
                config.gate.statistic, config.gate.lower, config.gate.upper
            ));
            if let Some(path) = &report.persisted {
                terminal::info(&format!("stored summary for {revision}"));
                terminal::path_output(path);
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            terminal::warning("summary not stored");
            super::fail("gate failed", &e)
        }
    }
}

/// Layer CLI flags over the loaded configuration.
fn apply_overrides(config: &mut HarnessConfig, args: &RunArgs) -> Result<()> {
    if let Some(trials) = args.trials {
        config.trials = trials;
    }
    if !args.workloads.is_empty() {
        config.workloads.clone_from(&args.workloads);
    }
    if let Some(root) = &args.root {
        config.project_root.clone_from(root);
    }
    if let Some(metric) = &args.metric {
        config.metric_column = ColumnRef::parse(metric);
    }
    if !args.select.is_empty() {
        config.gate.select = args
            .select
            .iter()
            .map(|s| parse_condition(s))
            .collect::<Result<_>>()?;
    }
    if let Some(statistic) = args.statistic {
        config.gate.statistic = statistic.into();
    }
    if let Some(lower) = args.lower {
        config.gate.lower = lower;
    }
    if let Some(upper) = args.upper {
        config.gate.upper = upper;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    config.validate()
}

/// `COLUMN=VALUE`, split on the first `=`.
fn parse_condition(s: &str) -> Result<ColumnMatch> {
    let Some((column, value)) = s.split_once('=') else {
        return Err(Error::Config(format!(
            "expected COLUMN=VALUE, got `{s}`"
        )));
    };
    Ok(ColumnMatch::new(ColumnRef::parse(column), value))
}
