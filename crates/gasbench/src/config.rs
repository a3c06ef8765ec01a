//! Harness configuration.
//!
//! Defaults describe the stock setup: contracts under `test/`, the
//! `evm2near` compiler at the repository root and the sandbox benchmark
//! runtime under `tools/benchmark`. A TOML file may override any field;
//! CLI flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gasbench_table::{ColumnRef, KeyColumns};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gate::{AcceptanceInterval, ColumnMatch, RowSelector, Statistic};
use crate::process::CommandSpec;
use crate::{Error, Result};

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "gasbench.toml";

/// A program plus argument templates.
///
/// Arguments may contain `{name}`, `{source}`, `{artifact}` and
/// `{revision}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Expand placeholders and bind to a working directory.
    #[must_use]
    pub fn render(&self, working_dir: &Path, vars: &[(&str, &str)]) -> CommandSpec {
        CommandSpec::new(expand(&self.program, vars), working_dir)
            .args(self.args.iter().map(|a| expand(a, vars)))
    }
}

/// Replace every `{key}` in `template` with its value.
#[must_use]
pub fn expand(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

/// Regression gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Conditions that pick the single row under watch.
    pub select: Vec<ColumnMatch>,
    pub statistic: Statistic,
    pub lower: f64,
    pub upper: f64,
}

impl GateConfig {
    pub fn interval(&self) -> Result<AcceptanceInterval> {
        AcceptanceInterval::new(self.lower, self.upper)
    }

    #[must_use]
    pub fn selector(&self) -> RowSelector {
        RowSelector::new(self.select.clone())
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            select: vec![
                ColumnMatch::new(1usize, "calc"),
                ColumnMatch::new(3usize, r#"{"loop_limit":3000}"#),
            ],
            statistic: Statistic::Mean,
            lower: 248.0,
            upper: 257.0,
        }
    }
}

/// Full harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Repository root; relative paths below resolve against it.
    pub project_root: PathBuf,
    /// Number of build/execute trials.
    pub trials: usize,
    /// Workloads to benchmark. Empty means discover from `inputs_dir`.
    pub workloads: Vec<String>,
    /// Directory of workload sources, relative to `project_root`.
    pub source_dir: PathBuf,
    /// Source file name template.
    pub source: String,
    /// Artifact path template, relative to `project_root`.
    pub artifact: String,
    pub compiler: CommandTemplate,
    /// Runtime working directory, relative to `project_root`.
    pub runtime_dir: PathBuf,
    pub runtime: CommandTemplate,
    /// Runtime output template, relative to `runtime_dir`.
    pub runtime_output: String,
    /// One `<workload>.json` per workload, relative to `project_root`.
    pub inputs_dir: PathBuf,
    /// Result store directory, relative to `project_root`.
    pub store_dir: PathBuf,
    pub metric_column: ColumnRef,
    pub key_columns: KeyColumns,
    /// Column naming the workload of each runtime row.
    pub workload_column: ColumnRef,
    /// Per-process timeout in seconds; 0 disables.
    pub timeout_secs: u64,
    pub gate: GateConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            trials: 10,
            workloads: Vec::new(),
            source_dir: PathBuf::from("test"),
            source: "{name}.sol".to_string(),
            artifact: "{name}.wasm".to_string(),
            compiler: CommandTemplate::new(
                "./evm2near",
                ["{source}", "-o", "{artifact}", "-b", "near"],
            ),
            runtime_dir: PathBuf::from("tools/benchmark"),
            runtime: CommandTemplate::new("cargo", ["run", "--release"]),
            runtime_output: "csvs/{revision}.csv".to_string(),
            inputs_dir: PathBuf::from("tools/benchmark/inputs"),
            store_dir: PathBuf::from("tools/benchmark/results"),
            metric_column: ColumnRef::Index(5),
            key_columns: KeyColumns::default(),
            workload_column: ColumnRef::Index(1),
            timeout_secs: 30 * 60,
            gate: GateConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse a TOML document. Missing fields keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load `path`, or `gasbench.toml` in the working directory if present,
    /// or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Check values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(Error::Config("trials must be at least 1".to_string()));
        }
        if self.compiler.program.is_empty() || self.runtime.program.is_empty() {
            return Err(Error::Config("compiler and runtime programs must be set".to_string()));
        }
        if self.gate.select.is_empty() {
            return Err(Error::Config("gate.select needs at least one condition".to_string()));
        }
        self.gate.interval()?;
        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    #[must_use]
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.project_root.join(relative)
    }

    #[must_use]
    pub fn runtime_dir(&self) -> PathBuf {
        self.resolve(&self.runtime_dir)
    }

    #[must_use]
    pub fn store_dir(&self) -> PathBuf {
        self.resolve(&self.store_dir)
    }

    #[must_use]
    pub fn inputs_dir(&self) -> PathBuf {
        self.resolve(&self.inputs_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand() {
        let vars = [("name", "calc"), ("artifact", "calc.wasm")];
        assert_eq!(expand("{name}.sol", &vars), "calc.sol");
        assert_eq!(expand("-o {artifact}", &vars), "-o calc.wasm");
        assert_eq!(expand("{unknown}", &vars), "{unknown}");
    }

    #[test]
    fn test_default_compiler_render() {
        let config = HarnessConfig::default();
        let cmd = config.compiler.render(
            Path::new("."),
            &[("source", "test/calc.sol"), ("artifact", "calc.wasm")],
        );
        assert_eq!(cmd.to_string(), "./evm2near test/calc.sol -o calc.wasm -b near");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml(
            r#"
trials = 3
workloads = ["calc", "const"]
metric_column = "Avg Tgas used"

[gate]
statistic = "variance"
lower = 0.0
upper = 4.0

[[gate.select]]
column = "Contract"
value = "calc"
"#,
        )
        .unwrap();

        assert_eq!(config.trials, 3);
        assert_eq!(config.workloads, ["calc", "const"]);
        assert_eq!(config.metric_column, ColumnRef::from("Avg Tgas used"));
        assert_eq!(config.gate.statistic, Statistic::Variance);
        assert_eq!(config.gate.select, [ColumnMatch::new("Contract", "calc")]);
        assert_eq!(config.runtime_dir, PathBuf::from("tools/benchmark"));
        assert_eq!(config.key_columns, KeyColumns::default());
        assert_eq!(config.workload_column, ColumnRef::Index(1));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_trials() {
        let config = HarnessConfig {
            trials: 0,
            ..HarnessConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_interval() {
        let mut config = HarnessConfig::default();
        config.gate.lower = 260.0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            HarnessConfig::from_toml("trials = \"many\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_timeout() {
        let mut config = HarnessConfig::default();
        assert_eq!(config.timeout(), Some(Duration::from_secs(1800)));
        config.timeout_secs = 0;
        assert_eq!(config.timeout(), None);
    }
}
