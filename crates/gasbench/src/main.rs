//! gasbench CLI - gas regression harness

mod cli;
mod commands;
mod terminal;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let metrics_handle = if cli.metrics {
        gasbench::metrics::CliRecorder::new().install()
    } else {
        None
    };
    gasbench::metrics::init();

    let default_level = if cli.verbose {
        "gasbench=debug"
    } else if cli.silent {
        "gasbench=error"
    } else {
        "gasbench=info"
    };
    // RUST_LOG replaces the default filter when set.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let exit_code = commands::run_command(&cli);

    if let Some(handle) = metrics_handle {
        handle.print_summary();
    }

    std::process::exit(exit_code);
}
