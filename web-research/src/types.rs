//! Ephemeral data carried through one review's web leg.

use serde::Serialize;

/// One search hit after authority ranking. Rank 0 is the most relevant.
#[derive(Clone, Debug, Serialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub rank: usize,
}

/// A code region pulled out of a fetched page, with the prose around it.
///
/// Invariant: `code_block` is non-empty after trimming — the extractor drops
/// whitespace-only regions before they reach the synthesizer.
#[derive(Clone, Debug, Serialize)]
pub struct ExtractedSnippet {
    pub source_url: String,
    pub code_block: String,
    pub surrounding_context: String,
    pub language_hint: Option<String>,
}
