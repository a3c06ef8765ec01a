//! Staging area shared by the compiler output and the runtime.
//!
//! Artifact names are fixed per workload, so a trial must clean up before
//! the next one stages.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::Result;
use crate::compiler::Artifact;
use crate::process::remove_if_exists;

/// The directory the runtime loads artifacts from.
#[derive(Debug, Clone)]
pub struct Staging {
    dir: PathBuf,
}

impl Staging {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `artifact` lands when staged.
    #[must_use]
    pub fn staged_path(&self, artifact: &Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    /// Copy `artifact` into the staging directory.
    pub fn stage(&self, artifact: &Artifact) -> Result<PathBuf> {
        let dest = self.staged_path(artifact);
        std::fs::copy(&artifact.path, &dest)?;
        debug!(workload = %artifact.workload, dest = %dest.display(), "staged");
        Ok(dest)
    }

    /// Remove staged files by name. Absent files are not an error.
    pub fn clean<I, P>(&self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut removed = 0;
        for name in names {
            if remove_if_exists(&self.dir.join(name))? {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, dir = %self.dir.display(), "cleaned staging");
        }
        Ok(removed)
    }
}
