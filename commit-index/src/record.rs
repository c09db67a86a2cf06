//! Core data model for captured commits.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Set of repository ids a query or review is restricted to.
/// Empty means "all tracked repositories".
pub type RepoScope = BTreeSet<String>;

/// One captured commit as stored in the journal.
///
/// The capture hooks own creation; this crate only reads records and, during
/// the indexing pass, attaches the embedding. Once an embedding is set the
/// record is immutable except for re-embedding on a model change.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Stable identifier: `<repo>@<hash>`.
    pub id: String,
    /// Repository id (the tracked repository's path or configured name).
    pub repo: String,
    /// Full commit hash.
    pub hash: String,
    /// Commit message.
    pub message: String,
    /// Unified diff text of the commit.
    pub diff_text: String,
    /// Commit author.
    pub author: String,
    /// Commit timestamp.
    pub timestamp: DateTime<Utc>,
    /// Paths touched by the commit, in diff order.
    #[serde(default)]
    pub changed_files: Vec<String>,
    /// Unit-normalized embedding; present once the record has been indexed.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl CommitRecord {
    /// The text that gets embedded: message, changed file names, then diff.
    /// Filenames carry a lot of topical signal for short commit messages.
    pub fn embedding_text(&self) -> String {
        let mut text = String::with_capacity(
            self.message.len() + self.diff_text.len() + 64,
        );
        text.push_str(&self.message);
        if !self.changed_files.is_empty() {
            text.push('\n');
            text.push_str(&self.changed_files.join(" "));
        }
        text.push('\n');
        text.push_str(&self.diff_text);
        text
    }

    /// True when `scope` is empty or names this record's repository.
    pub fn in_scope(&self, scope: &RepoScope) -> bool {
        scope.is_empty() || scope.contains(&self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(repo: &str) -> CommitRecord {
        CommitRecord {
            id: format!("{repo}@abc123"),
            repo: repo.to_string(),
            hash: "abc123".into(),
            message: "add retry".into(),
            diff_text: "+ retry()".into(),
            author: "dev".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            changed_files: vec!["src/net.rs".into()],
            embedding: None,
        }
    }

    #[test]
    fn embedding_text_includes_message_files_and_diff() {
        let text = record("repoA").embedding_text();
        assert!(text.contains("add retry"));
        assert!(text.contains("src/net.rs"));
        assert!(text.contains("+ retry()"));
    }

    #[test]
    fn empty_scope_matches_everything() {
        let r = record("repoA");
        assert!(r.in_scope(&RepoScope::new()));
        assert!(r.in_scope(&RepoScope::from(["repoA".to_string()])));
        assert!(!r.in_scope(&RepoScope::from(["repoB".to_string()])));
    }
}
