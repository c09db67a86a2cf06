//! Embedding executor: fills missing embeddings with bounded concurrency.

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::index::EmbeddingIndex;
use crate::record::RepoScope;
use crate::store::CommitStore;

/// Outcome of one `embed_all` pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmbedSummary {
    /// Records embedded and indexed in this pass.
    pub embedded: usize,
    /// Records skipped because the embedding backend failed for them.
    pub skipped: usize,
}

/// Embeds every record in `scope` that has no embedding yet, publishing each
/// vector into `index` and attaching it to the store's record.
///
/// A per-record backend failure is logged and counted as skipped; the pass
/// itself never fails on backend unavailability.
pub async fn embed_all(
    store: &mut CommitStore,
    index: &EmbeddingIndex,
    scope: &RepoScope,
    concurrency: usize,
) -> EmbedSummary {
    let pending: Vec<usize> = store
        .records_mut()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.embedding.is_none() && r.in_scope(scope))
        .map(|(i, _)| i)
        .collect();

    if pending.is_empty() {
        debug!("embed_all: nothing to embed");
        return EmbedSummary::default();
    }

    info!(
        "embed_all: {} records, concurrency={}",
        pending.len(),
        concurrency
    );

    let bar = ProgressBar::new(pending.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {pos}/{len} embedding commits")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let records = store.records_mut();
    let results: Vec<(usize, Option<Vec<f32>>)> = stream::iter(pending)
        .map(|i| {
            let record = records[i].clone();
            let bar = bar.clone();
            async move {
                let out = match index.index(&record).await {
                    Ok(vector) => Some(vector),
                    Err(e) => {
                        warn!("embed_all: skipping {}: {}", record.id, e);
                        None
                    }
                };
                bar.inc(1);
                (i, out)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    bar.finish_and_clear();

    let mut summary = EmbedSummary::default();
    for (i, vector) in results {
        match vector {
            Some(v) => {
                records[i].embedding = Some(v);
                summary.embedded += 1;
            }
            None => summary.skipped += 1,
        }
    }

    info!(
        "embed_all: done embedded={} skipped={}",
        summary.embedded, summary.skipped
    );
    summary
}
