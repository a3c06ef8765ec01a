//! Command implementations.

mod compare;
mod run;
mod symbolize;

use std::path::Path;

use gasbench::HarnessConfig;
use tracing::error;

use crate::cli::{Cli, Commands, EXIT_FAILURE, RunArgs};
use crate::terminal;

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    let config_path = cli.config.as_deref();
    match &cli.command {
        None => run::cmd_run(config_path, &RunArgs::default(), cli.silent),
        Some(Commands::Run(args)) => run::cmd_run(config_path, args, cli.silent),
        Some(Commands::Compare {
            base,
            head,
            tolerance,
        }) => compare::cmd_compare(config_path, base, head.as_deref(), *tolerance),
        Some(Commands::History) => compare::cmd_history(config_path),
        Some(Commands::Symbolize {
            functions,
            input,
            output,
        }) => symbolize::cmd_symbolize(functions, input, output),
    }
}

/// Load the config file, reporting failures. `None` means the caller should exit.
fn load_config(path: Option<&Path>) -> Option<HarnessConfig> {
    match HarnessConfig::load(path) {
        Ok(config) => Some(config),
        Err(e) => {
            error!(error = %e, "failed to load config");
            terminal::error(&e.to_string());
            None
        }
    }
}

/// Log and print a command failure, returning the failure exit code.
fn fail(context: &str, err: &gasbench::Error) -> i32 {
    error!(error = %err, "{context}");
    terminal::error(&format!("{context}: {err}"));
    EXIT_FAILURE
}
