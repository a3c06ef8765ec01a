//! Build adapter: compiles one workload with the external compiler.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info_span};

use crate::config::{CommandTemplate, HarnessConfig, expand};
use crate::process::{ProcessRunner, remove_if_exists};
use crate::registry::Workload;
use crate::{Error, Result};

/// A compiled workload on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub workload: Workload,
    pub path: PathBuf,
}

impl Artifact {
    /// File name used when staging.
    #[must_use]
    pub fn file_name(&self) -> &std::ffi::OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }
}

/// Invokes the compiler for a single workload.
pub struct Compiler<'a> {
    runner: &'a dyn ProcessRunner,
    command: CommandTemplate,
    project_root: PathBuf,
    source_dir: PathBuf,
    source: String,
    artifact: String,
}

impl<'a> Compiler<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, config: &HarnessConfig) -> Self {
        Self {
            runner,
            command: config.compiler.clone(),
            project_root: config.project_root.clone(),
            source_dir: config.source_dir.clone(),
            source: config.source.clone(),
            artifact: config.artifact.clone(),
        }
    }

    /// Artifact path relative to the project root.
    #[must_use]
    pub fn artifact_relative(&self, workload: &Workload) -> PathBuf {
        PathBuf::from(expand(&self.artifact, &[("name", workload.name())]))
    }

    /// Absolute (or root-relative) artifact path.
    #[must_use]
    pub fn artifact_path(&self, workload: &Workload) -> PathBuf {
        self.project_root.join(self.artifact_relative(workload))
    }

    fn source_relative(&self, workload: &Workload) -> PathBuf {
        self.source_dir
            .join(expand(&self.source, &[("name", workload.name())]))
    }

    /// Compile `workload`.
    ///
    /// Any stale artifact is removed first so a failed build can never leave
    /// an old artifact behind to be benchmarked.
    pub fn build(&self, workload: &Workload) -> Result<Artifact> {
        let _span = info_span!("build", workload = %workload).entered();
        let path = self.artifact_path(workload);
        remove_if_exists(&path)?;

        let source = display(&self.source_relative(workload));
        let artifact = display(&self.artifact_relative(workload));
        let command = self.command.render(
            &self.project_root,
            &[
                ("name", workload.name()),
                ("source", source.as_str()),
                ("artifact", artifact.as_str()),
            ],
        );

        let start = Instant::now();
        let report = self.runner.run(&command)?.check_timeout(&command)?;
        crate::metrics::record_build(workload.name(), start.elapsed());

        if !report.outcome.success() {
            return Err(Error::Build {
                workload: workload.name().to_string(),
                outcome: report.outcome,
                stderr: report.stderr,
            });
        }
        if !path.exists() {
            return Err(Error::MissingArtifact {
                workload: workload.name().to_string(),
                path,
            });
        }

        debug!(artifact = %path.display(), "built");
        Ok(Artifact {
            workload: workload.clone(),
            path,
        })
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
