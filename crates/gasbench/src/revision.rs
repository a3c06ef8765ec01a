//! Revision identifiers: the key results are stored under.

use std::fmt;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::{Error, Result};

/// CI indicator. When set, the checked-out commit is a merge commit made by
/// CI and the revision under test is the one before it.
pub const CI_ENV: &str = "GITHUB_SHA";

/// A short commit hash or similar; always usable as a single file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionId(String);

impl RevisionId {
    /// Validate and trim a revision id.
    pub fn parse(s: &str) -> Result<Self> {
        let id = s.trim();
        if id.is_empty() {
            return Err(Error::Revision("empty revision id".to_string()));
        }
        if id == "." || id == ".." || id.contains(['/', '\\']) || id.chars().any(char::is_control)
        {
            return Err(Error::Revision(format!(
                "`{id}` is not usable as a file name"
            )));
        }
        Ok(Self(id.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the revision id comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionSource {
    /// `git rev-parse --short HEAD`.
    Head,
    /// Second entry of `git log --pretty=format:%h -n 2`.
    PreviousCommit,
}

impl RevisionSource {
    /// `PreviousCommit` under CI, `Head` otherwise.
    #[must_use]
    pub fn from_env() -> Self {
        if std::env::var_os(CI_ENV).is_some() {
            Self::PreviousCommit
        } else {
            Self::Head
        }
    }

    fn git_args(self) -> &'static [&'static str] {
        match self {
            Self::Head => &["rev-parse", "--short", "HEAD"],
            Self::PreviousCommit => &["log", "--pretty=format:%h", "-n", "2"],
        }
    }

    /// Pick the revision out of git's stdout.
    fn parse_output(self, stdout: &str) -> Result<RevisionId> {
        let line = match self {
            Self::Head => stdout.lines().next(),
            Self::PreviousCommit => stdout.lines().nth(1),
        };
        line.map_or_else(
            || {
                Err(Error::Revision(format!(
                    "unexpected git output for {self:?}: `{}`",
                    stdout.trim()
                )))
            },
            RevisionId::parse,
        )
    }
}

/// Resolve the revision: an explicit id wins, otherwise ask git in `repo`.
pub fn resolve(explicit: Option<&str>, repo: &Path) -> Result<RevisionId> {
    if let Some(id) = explicit {
        return RevisionId::parse(id);
    }
    resolve_from_git(RevisionSource::from_env(), repo)
}

/// Ask git for the revision in `repo`.
pub fn resolve_from_git(origin: RevisionSource, repo: &Path) -> Result<RevisionId> {
    let output = Command::new("git")
        .args(origin.git_args())
        .current_dir(repo)
        .output()
        .map_err(|source| Error::Spawn {
            program: "git".to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(Error::Revision(format!(
            "git {} failed: {}",
            origin.git_args().join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let revision = origin.parse_output(&String::from_utf8_lossy(&output.stdout))?;
    debug!(%revision, ?origin, "resolved revision");
    Ok(revision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        assert_eq!(RevisionId::parse("a1b2c3d\n").unwrap().as_str(), "a1b2c3d");
    }

    #[test]
    fn test_parse_rejects_paths() {
        assert!(RevisionId::parse("").is_err());
        assert!(RevisionId::parse("  ").is_err());
        assert!(RevisionId::parse("..").is_err());
        assert!(RevisionId::parse("../etc").is_err());
        assert!(RevisionId::parse("a\\b").is_err());
    }

    #[test]
    fn test_head_output() {
        let rev = RevisionSource::Head.parse_output("a1b2c3d\n").unwrap();
        assert_eq!(rev.as_str(), "a1b2c3d");
    }

    #[test]
    fn test_previous_commit_output() {
        let rev = RevisionSource::PreviousCommit
            .parse_output("merge12\nfeat345")
            .unwrap();
        assert_eq!(rev.as_str(), "feat345");

        // A repository with a single commit has no previous one.
        assert!(RevisionSource::PreviousCommit.parse_output("only123").is_err());
    }

    #[test]
    fn test_explicit_wins() {
        let dir = tempfile::tempdir().unwrap();
        let rev = resolve(Some("deadbee"), dir.path()).unwrap();
        assert_eq!(rev.to_string(), "deadbee");
    }
}
