//! Read-only access to the captured-commit journal.
//!
//! The capture hooks append one JSON object per line; this reader is strict
//! about required fields and skips nothing silently. The pipeline never
//! writes here.

use std::io::{BufRead, BufReader};
use std::{fs::File, path::Path};

use tracing::{debug, info};

use crate::errors::{IndexError, IndexResult};
use crate::record::{CommitRecord, RepoScope};

/// In-memory view over the journal file.
pub struct CommitStore {
    records: Vec<CommitRecord>,
}

impl CommitStore {
    /// Wraps already-loaded records (used by tests and embedding passes that
    /// mutate their own copy).
    pub fn from_records(records: Vec<CommitRecord>) -> Self {
        Self { records }
    }

    /// Reads the journal JSONL strictly.
    ///
    /// Empty lines are ignored; a malformed line is a hard
    /// [`IndexError::Parse`] — the journal is machine-written, so damage
    /// means something upstream is broken.
    ///
    /// # Errors
    /// - [`IndexError::Io`] if the file cannot be read.
    /// - [`IndexError::Parse`] if any line fails deserialization.
    pub fn load(jsonl_path: impl AsRef<Path>) -> IndexResult<Self> {
        info!("reading commit journal: {:?}", jsonl_path.as_ref());

        let file = File::open(jsonl_path.as_ref())?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: CommitRecord = serde_json::from_str(&line)
                .map_err(|e| IndexError::Parse(format!("line {} parse error: {}", i + 1, e)))?;
            records.push(record);
        }

        debug!("loaded {} commit records", records.len());
        Ok(Self { records })
    }

    /// All records within `scope` (empty scope = all repositories).
    pub fn get_commits(&self, scope: &RepoScope) -> Vec<&CommitRecord> {
        self.records.iter().filter(|r| r.in_scope(scope)).collect()
    }

    /// One record by its stable id.
    ///
    /// # Errors
    /// [`IndexError::NotFound`] when no record carries `id`.
    pub fn get_commit(&self, id: &str) -> IndexResult<&CommitRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| IndexError::NotFound(id.to_string()))
    }

    /// True when `repo` appears in the journal.
    pub fn has_repo(&self, repo: &str) -> bool {
        self.records.iter().any(|r| r.repo == repo)
    }

    /// Mutable iteration for the embedding pass.
    pub(crate) fn records_mut(&mut self) -> &mut [CommitRecord] {
        &mut self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn journal_line(id: &str, repo: &str) -> String {
        format!(
            r#"{{"id":"{id}","repo":"{repo}","hash":"h","message":"m","diff_text":"d","author":"a","timestamp":"2025-06-01T12:00:00Z"}}"#
        )
    }

    #[test]
    fn loads_jsonl_and_filters_by_scope() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{}", journal_line("repoA@1", "repoA")).unwrap();
        writeln!(f).unwrap();
        writeln!(f, "{}", journal_line("repoB@1", "repoB")).unwrap();

        let store = CommitStore::load(f.path()).unwrap();
        assert_eq!(store.get_commits(&RepoScope::new()).len(), 2);

        let scope = RepoScope::from(["repoA".to_string()]);
        let scoped = store.get_commits(&scope);
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id, "repoA@1");
    }

    #[test]
    fn malformed_line_is_a_parse_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "not json").unwrap();
        assert!(matches!(
            CommitStore::load(f.path()),
            Err(IndexError::Parse(_))
        ));
    }

    #[test]
    fn missing_commit_is_not_found() {
        let store = CommitStore::from_records(Vec::new());
        assert!(matches!(
            store.get_commit("nope@1"),
            Err(IndexError::NotFound(_))
        ));
    }
}
