//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gasbench::Statistic;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "gasbench")]
#[command(about = "Gas regression harness - build, benchmark, aggregate and gate")]
#[command(version)]
pub struct Cli {
    /// TOML config file (default: ./gasbench.toml if present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets gasbench=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    /// Defaults to `run`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build, run all trials, aggregate, gate and store the summary
    Run(RunArgs),
    /// Compare two stored summaries
    Compare {
        /// Baseline revision
        #[arg(value_name = "BASE")]
        base: String,

        /// Revision to compare (default: current revision)
        #[arg(value_name = "HEAD")]
        head: Option<String>,

        /// Allowed increase of a row mean, in percent
        #[arg(short, long, default_value = "5")]
        tolerance: f64,
    },
    /// Replace function ids in a disassembly listing with names
    Symbolize {
        /// Dictionary of `<4-char id><name>` lines
        #[arg(long, default_value = "functions.txt")]
        functions: PathBuf,

        /// Listing to rewrite
        #[arg(long, default_value = "compiled.wat")]
        input: PathBuf,

        /// Where to write the result
        #[arg(short, long, default_value = "applied.wat")]
        output: PathBuf,
    },
    /// List stored revisions
    History,
}

/// Overrides for a pipeline run. Every flag is optional.
#[derive(Args, Default)]
pub struct RunArgs {
    /// Number of trials
    #[arg(short = 'n', long)]
    pub trials: Option<usize>,

    /// Revision id (default: derived from git)
    #[arg(short, long)]
    pub revision: Option<String>,

    /// Workloads to benchmark (default: config list, or discovered inputs)
    #[arg(short, long, value_delimiter = ',')]
    pub workloads: Vec<String>,

    /// Project root
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Metric column, by index or header name
    #[arg(long, value_name = "COLUMN")]
    pub metric: Option<String>,

    /// Gate row condition `COLUMN=VALUE`; repeat to narrow
    #[arg(long = "select", value_name = "COLUMN=VALUE")]
    pub select: Vec<String>,

    /// Statistic to gate on
    #[arg(long, value_enum)]
    pub statistic: Option<StatisticArg>,

    /// Lower bound of the acceptance interval (inclusive)
    #[arg(long)]
    pub lower: Option<f64>,

    /// Upper bound of the acceptance interval (inclusive)
    #[arg(long)]
    pub upper: Option<f64>,

    /// Per-process timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Pass compiler and runtime stdout through
    #[arg(long)]
    pub show_output: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatisticArg {
    Mean,
    Variance,
    Min,
    Max,
}

impl From<StatisticArg> for Statistic {
    fn from(arg: StatisticArg) -> Self {
        match arg {
            StatisticArg::Mean => Self::Mean,
            StatisticArg::Variance => Self::Variance,
            StatisticArg::Min => Self::Min,
            StatisticArg::Max => Self::Max,
        }
    }
}
