//! Report model: matched commits, comparison sections, degradation notes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A commit ranked against the review topic.
///
/// Holds a weak reference (the id) into the journal; the matcher never owns
/// storage. Scores are rescaled cosine values in [0,1], non-increasing with
/// rank within one query's result set.
#[derive(Clone, Debug, Serialize)]
pub struct MatchedCommit {
    pub commit_id: String,
    pub similarity_score: f32,
    pub rank: usize,
}

/// One aspect of the comparison between web practice and local code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComparisonSection {
    pub aspect: String,
    pub web_practice_summary: String,
    pub local_code_observation: String,
    pub recommendation: String,
}

/// The model's reply after defensive parsing.
#[derive(Clone, Debug)]
pub enum ModelReply {
    /// The expected JSON array of sections.
    Structured(Vec<ComparisonSection>),
    /// Anything else: carried verbatim into one catch-all section.
    Fallback(String),
}

/// Final product of one `review` invocation. Always materializes, even when
/// sub-systems failed; `degraded_reasons` says which and why.
#[derive(Clone, Debug, Serialize)]
pub struct ReviewReport {
    pub topic: String,
    pub generated_at: DateTime<Utc>,
    pub comparison_sections: Vec<ComparisonSection>,
    pub degraded_reasons: BTreeSet<String>,
    /// Commits the comparison was grounded on, in rank order.
    pub matched_commits: Vec<MatchedCommit>,
    /// Source pages code examples were drawn from, deduplicated.
    pub web_sources: Vec<String>,
}

impl ReviewReport {
    /// True when every sub-step completed.
    pub fn is_complete(&self) -> bool {
        self.degraded_reasons.is_empty()
    }
}

/// Degradation markers. Stable strings: they end up in reports the user
/// reads and in tests that assert on them.
pub mod degraded {
    pub const WEB_SEARCH_UNAVAILABLE: &str =
        "web search unavailable — review based on local commits only";
    pub const NO_SNIPPETS_EXTRACTED: &str =
        "no code examples could be extracted from web results";
    pub const COMMIT_MATCHING_UNAVAILABLE: &str =
        "commit matching unavailable — review based on web sources only";
    pub const MODEL_UNAVAILABLE: &str = "language model unavailable — comparison omitted";
    pub const MODEL_UNSTRUCTURED: &str = "language model returned unstructured output";
    pub const NOTHING_TO_COMPARE: &str =
        "no comparison possible: no web content and no matching commits";
}
