//! The embedding index: unit-normalized vectors, cosine top-k.
//!
//! Vectors are normalized once at index time so a query is a plain dot
//! product. The raw cosine in [-1,1] is clamped and rescaled to [0,1] via
//! `(s+1)/2` so every reported score shares one range.
//!
//! Concurrency: reads take the read lock and can proceed in parallel;
//! `index` takes the write lock and publishes the whole entry in one step.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use llm_service::TextEmbedder;

use crate::errors::{IndexError, IndexResult};
use crate::record::{CommitRecord, RepoScope};
use crate::store::CommitStore;

/// One query hit: a commit id and its rescaled cosine score.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexHit {
    pub commit_id: String,
    pub score: f32,
}

#[derive(Clone, Debug)]
struct Entry {
    repo: String,
    timestamp: DateTime<Utc>,
    /// Unit-normalized embedding.
    vector: Vec<f32>,
}

/// In-process vector index over captured commits.
pub struct EmbeddingIndex {
    embedder: Arc<dyn TextEmbedder>,
    entries: RwLock<HashMap<String, Entry>>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of indexed records.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Embeds and indexes one record, returning the normalized vector that
    /// was stored (the caller attaches it to the record).
    ///
    /// # Errors
    /// - [`IndexError::EmbeddingUnavailable`] when the backend cannot be
    ///   reached; the record stays unindexed and the caller logs and skips.
    /// - [`IndexError::ZeroVector`] when the backend returns a zero vector.
    pub async fn index(&self, record: &CommitRecord) -> IndexResult<Vec<f32>> {
        let raw = self.embedder.embed(&record.embedding_text()).await?;
        let vector =
            normalize(&raw).ok_or_else(|| IndexError::ZeroVector(record.id.clone()))?;

        self.publish(record, vector.clone()).await;
        Ok(vector)
    }

    /// Indexes a record whose embedding was computed in an earlier pass.
    /// Normalization is idempotent, so re-seeding stored vectors is safe.
    pub async fn insert_precomputed(&self, record: &CommitRecord) -> IndexResult<()> {
        let Some(raw) = record.embedding.as_deref() else {
            return Ok(());
        };
        let vector = normalize(raw).ok_or_else(|| IndexError::ZeroVector(record.id.clone()))?;
        self.publish(record, vector).await;
        Ok(())
    }

    /// Seeds the index from every already-embedded record in the store.
    /// Records without embeddings are excluded, never an error.
    pub async fn seed_from_store(&self, store: &CommitStore) -> IndexResult<usize> {
        let mut seeded = 0usize;
        for record in store.get_commits(&RepoScope::new()) {
            if record.embedding.is_some() {
                self.insert_precomputed(record).await?;
                seeded += 1;
            }
        }
        debug!("index seeded with {} embedded records", seeded);
        Ok(seeded)
    }

    async fn publish(&self, record: &CommitRecord, vector: Vec<f32>) {
        let entry = Entry {
            repo: record.repo.clone(),
            timestamp: record.timestamp,
            vector,
        };
        // Single write-lock section: a reader sees the entry fully or not at all.
        self.entries.write().await.insert(record.id.clone(), entry);
    }

    /// Embeds `text` and returns the top-`k` hits within `scope` by
    /// descending score; ties break toward the most recent commit.
    ///
    /// An empty index returns an empty vector without touching the embedding
    /// backend.
    pub async fn query(&self, text: &str, k: usize, scope: &RepoScope) -> IndexResult<Vec<IndexHit>> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }
        let raw = self.embedder.embed(text).await?;
        let Some(qv) = normalize(&raw) else {
            trace!("query text embedded to a zero vector; no hits");
            return Ok(Vec::new());
        };
        Ok(self.query_vector(&qv, k, scope).await)
    }

    /// Pure ranking over an already-normalized query vector.
    pub async fn query_vector(&self, qv: &[f32], k: usize, scope: &RepoScope) -> Vec<IndexHit> {
        let entries = self.entries.read().await;

        let mut scored: Vec<(&String, &Entry, f32)> = entries
            .iter()
            .filter(|(_, e)| scope.is_empty() || scope.contains(&e.repo))
            .map(|(id, e)| (id, e, rescale(dot(qv, &e.vector))))
            .collect();

        // Score desc, then most recent first, then id for total determinism.
        scored.sort_by(|a, b| {
            b.2.total_cmp(&a.2)
                .then(b.1.timestamp.cmp(&a.1.timestamp))
                .then(a.0.cmp(b.0))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(id, _, score)| IndexHit {
                commit_id: id.clone(),
                score,
            })
            .collect()
    }
}

/// Unit-normalizes a vector; `None` when the magnitude is zero (cosine is
/// undefined there).
pub fn normalize(v: &[f32]) -> Option<Vec<f32>> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    Some(v.iter().map(|x| x / norm).collect())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Clamps a raw cosine to [-1,1] and rescales to [0,1].
fn rescale(s: f32) -> f32 {
    (s.clamp(-1.0, 1.0) + 1.0) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use llm_service::{LlmError, LlmResult};

    /// Deterministic embedder: hashes characters into a small fixed vector.
    struct CharEmbedder;

    #[async_trait]
    impl TextEmbedder for CharEmbedder {
        async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
            let mut v = vec![0.0f32; 8];
            for (i, b) in text.bytes().enumerate() {
                v[i % 8] += f32::from(b) / 255.0;
            }
            Ok(v)
        }
    }

    /// Embedder that always fails as unreachable.
    struct DownEmbedder;

    #[async_trait]
    impl TextEmbedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> LlmResult<Vec<f32>> {
            Err(LlmError::Unavailable("connection refused".into()))
        }
    }

    fn record(id: &str, repo: &str, message: &str, day: u32) -> CommitRecord {
        CommitRecord {
            id: id.into(),
            repo: repo.into(),
            hash: id.into(),
            message: message.into(),
            diff_text: String::new(),
            author: "dev".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap(),
            changed_files: Vec::new(),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn empty_index_query_is_empty_not_error() {
        let index = EmbeddingIndex::new(Arc::new(DownEmbedder));
        // Backend is down, but an empty index never calls it.
        let hits = index.query("anything", 5, &RepoScope::new()).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn query_returns_at_most_k_sorted_non_increasing() {
        let index = EmbeddingIndex::new(Arc::new(CharEmbedder));
        for (i, msg) in ["rate limiting", "retry backoff", "parse config", "ui polish"]
            .iter()
            .enumerate()
        {
            index
                .index(&record(&format!("r@{i}"), "repoA", msg, 1 + i as u32))
                .await
                .unwrap();
        }

        let hits = index
            .query("rate limiting", 3, &RepoScope::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for hit in &hits {
            assert!((0.0..=1.0).contains(&hit.score));
        }
    }

    #[tokio::test]
    async fn ties_break_toward_most_recent_timestamp() {
        let index = EmbeddingIndex::new(Arc::new(CharEmbedder));
        // Identical text → identical vectors → identical score.
        index.index(&record("r@old", "repoA", "same text", 1)).await.unwrap();
        index.index(&record("r@new", "repoA", "same text", 20)).await.unwrap();

        let hits = index.query("same text", 2, &RepoScope::new()).await.unwrap();
        assert_eq!(hits[0].commit_id, "r@new");
        assert_eq!(hits[1].commit_id, "r@old");
    }

    #[tokio::test]
    async fn scope_restricts_results() {
        let index = EmbeddingIndex::new(Arc::new(CharEmbedder));
        index.index(&record("a@1", "repoA", "auth token", 1)).await.unwrap();
        index.index(&record("b@1", "repoB", "auth token", 2)).await.unwrap();

        let scope = RepoScope::from(["repoB".to_string()]);
        let hits = index.query("auth token", 10, &scope).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].commit_id, "b@1");
    }

    #[tokio::test]
    async fn unavailable_backend_surfaces_embedding_unavailable() {
        let down = EmbeddingIndex::new(Arc::new(DownEmbedder));
        down.insert_precomputed(&CommitRecord {
            embedding: Some(vec![1.0, 0.0]),
            ..record("a@1", "repoA", "x", 1)
        })
        .await
        .unwrap();
        let err = down.query("x", 1, &RepoScope::new()).await.unwrap_err();
        assert!(matches!(err, IndexError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn reindexing_is_idempotent() {
        let index = EmbeddingIndex::new(Arc::new(CharEmbedder));
        let r = record("a@1", "repoA", "stable text", 1);
        let v1 = index.index(&r).await.unwrap();
        let v2 = index.index(&r).await.unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn rescaled_cosine_is_bounded_and_symmetric() {
        let a = normalize(&[3.0, 4.0]).unwrap();
        let b = normalize(&[-4.0, 3.0]).unwrap();
        let s_ab = rescale(dot(&a, &b));
        let s_ba = rescale(dot(&b, &a));
        assert_eq!(s_ab, s_ba);
        assert!((0.0..=1.0).contains(&s_ab));

        let opposite = normalize(&[-3.0, -4.0]).unwrap();
        assert!((rescale(dot(&a, &opposite)) - 0.0).abs() < 1e-6);
        assert!((rescale(dot(&a, &a)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_does_not_normalize() {
        assert!(normalize(&[0.0, 0.0]).is_none());
    }
}
