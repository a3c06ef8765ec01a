//! Workload registry - the ordered list of contracts to benchmark.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::{Error, Result};

/// A named contract compiled and measured each trial.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Workload {
    name: String,
}

impl Workload {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ordered, duplicate-free set of workloads.
///
/// Order is fixed for a run: every trial builds and reports in this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    workloads: Vec<Workload>,
}

impl Registry {
    /// Build from explicit names, rejecting empty lists and duplicates.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut workloads = Vec::new();
        for name in names {
            let name = name.into();
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(Error::Config(format!("invalid workload name `{name}`")));
            }
            if !seen.insert(name.clone()) {
                return Err(Error::Config(format!("workload `{name}` listed twice")));
            }
            workloads.push(Workload::new(name));
        }
        if workloads.is_empty() {
            return Err(Error::Config("no workloads to benchmark".to_string()));
        }
        Ok(Self { workloads })
    }

    /// Discover workloads from `<name>.json` input files, sorted by name.
    pub fn discover(inputs_dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(inputs_dir).map_err(|e| {
            Error::Config(format!("cannot read inputs dir {}: {e}", inputs_dir.display()))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        // read_dir order is platform-dependent; rows must line up across trials.
        names.sort();
        debug!(dir = %inputs_dir.display(), count = names.len(), "discovered workloads");
        Self::from_names(names)
    }

    /// Explicit names when given, otherwise discovery.
    pub fn from_config(names: &[String], inputs_dir: &Path) -> Result<Self> {
        if names.is_empty() {
            Self::discover(inputs_dir)
        } else {
            Self::from_names(names.iter().cloned())
        }
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Workload> {
        self.workloads.iter().find(|w| w.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Workload> {
        self.workloads.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.workloads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workloads.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Workload;
    type IntoIter = std::slice::Iter<'a, Workload>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
