//! Result store: one summary CSV per revision.

use std::fs;
use std::path::{Path, PathBuf};

use gasbench_table::{ColumnRef, SummaryTable};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::Result;
use crate::revision::RevisionId;

const EXTENSION: &str = "csv";

/// Directory of `{revision}.csv` summary records.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, revision: &RevisionId) -> PathBuf {
        self.dir.join(format!("{revision}.{EXTENSION}"))
    }

    /// Write `summary` as the record for `revision`, replacing any previous one.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so readers see either the old record or the new one.
    pub fn persist(&self, revision: &RevisionId, summary: &SummaryTable) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(revision);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        summary.write_csv(&mut tmp)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        info!(%revision, path = %path.display(), rows = summary.len(), "persisted summary");
        Ok(path)
    }

    /// Read back the record for `revision`.
    pub fn load(&self, revision: &RevisionId, metric: &ColumnRef) -> Result<SummaryTable> {
        let path = self.path_for(revision);
        debug!(%revision, path = %path.display(), "loading summary");
        Ok(SummaryTable::from_path(&path, metric)?)
    }

    /// Stored revision ids, sorted. An absent directory holds none.
    pub fn revisions(&self) -> Result<Vec<RevisionId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut revisions = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && let Ok(revision) = RevisionId::parse(stem)
            {
                revisions.push(revision);
            }
        }
        revisions.sort();
        Ok(revisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasbench_table::{SampleStats, SummaryRow, format_value};

    fn summary(mean: f64) -> SummaryTable {
        let header = ["Commit", "Contract", "Method", "Input", "Tgas burned", "Avg Tgas used"]
            .map(String::from)
            .to_vec();
        let mean_cell = format_value(mean);
        let cells = ["abc1234", "calc", "run", "{}", "3", mean_cell.as_str()]
            .map(String::from)
            .to_vec();
        let stats = SampleStats::from_samples(&[mean - 2.0, mean, mean + 2.0]).unwrap();
        SummaryTable::new(header, 5, vec![SummaryRow { cells, stats }])
    }

    #[test]
    fn test_persist_twice_keeps_last() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("results"));
        let revision = RevisionId::parse("abc1234").unwrap();

        let first = store.persist(&revision, &summary(100.0)).unwrap();
        let second = store.persist(&revision, &summary(252.0)).unwrap();
        assert_eq!(first, second);

        let files: Vec<_> = fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(files.len(), 1, "no temp files or duplicates left behind");

        let loaded = store.load(&revision, &ColumnRef::Index(5)).unwrap();
        assert_eq!(loaded.rows()[0].stats.mean, 252.0);
        assert_eq!(loaded.rows()[0].stats.variance, Some(4.0));
        assert_eq!(loaded.rows()[0].cell(1), Some("calc"));
    }

    #[test]
    fn test_revisions_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        assert!(store.revisions().unwrap().is_empty());

        for id in ["ccc", "aaa", "bbb"] {
            store
                .persist(&RevisionId::parse(id).unwrap(), &summary(1.0))
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let ids: Vec<String> = store
            .revisions()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, ["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn test_missing_directory_has_no_revisions() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("absent"));
        assert!(store.revisions().unwrap().is_empty());
    }
}
