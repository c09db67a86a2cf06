//! Topic → ranked local commits, via the embedding index.

use commit_index::{EmbeddingIndex, IndexResult, RepoScope};
use tracing::debug;

use crate::report::MatchedCommit;

/// Ranks tracked commits by semantic relevance to `topic`, restricted to
/// `scope` (empty scope = all repositories).
///
/// Deterministic for identical index state and topic text: the index sorts
/// by score, then recency, then id.
///
/// # Errors
/// Propagates [`commit_index::IndexError`] when the embedding backend is
/// unreachable; an empty index is not an error.
pub async fn match_commits(
    index: &EmbeddingIndex,
    topic: &str,
    scope: &RepoScope,
    k: usize,
) -> IndexResult<Vec<MatchedCommit>> {
    let hits = index.query(topic, k, scope).await?;
    debug!("match: {} commits for topic {:?}", hits.len(), topic);

    Ok(hits
        .into_iter()
        .enumerate()
        .map(|(rank, hit)| MatchedCommit {
            commit_id: hit.commit_id,
            similarity_score: hit.score,
            rank,
        })
        .collect())
}
