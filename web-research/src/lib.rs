//! Web retrieval for the review pipeline.
//!
//! Flow:
//!   1) [`query::shape_query`] turns a journal topic into a searchable query;
//!   2) [`WebRetriever::search`] walks the configured backends in priority
//!      order (Brave first when a key is present, DuckDuckGo as the keyless
//!      fallback) and ranks the hits by source authority;
//!   3) [`WebRetriever::extract_all`] fetches the pages concurrently under a
//!      bounded limit and pulls out code regions with surrounding prose,
//!      preserving search-rank order regardless of completion order.
//!
//! Failure posture: a backend that errors is skipped (and disabled for the
//! session once its rate-limit budget is spent); a page that cannot be
//! fetched or parsed yields zero snippets. Only the total loss of every
//! backend surfaces as [`WebError::SearchUnavailable`].

pub mod backends;
pub mod config;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod query;
pub mod types;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use backends::{BraveSearch, DuckDuckGoSearch, SearchBackend};
use config::ResearchConfig;
use errors::{WebError, WebResult};
use extract::ContentExtractor;
use fetch::{HttpFetcher, PageFetch};
use query::{rank_results, shape_query};
use types::{ExtractedSnippet, SearchResult};

struct BackendSlot {
    backend: Arc<dyn SearchBackend>,
    /// Set once the backend's rate-limit budget is exhausted; stays set for
    /// the rest of the session.
    disabled: AtomicBool,
}

/// Search + fetch + extract, behind one object the pipeline owns.
pub struct WebRetriever {
    slots: Vec<BackendSlot>,
    fetcher: Arc<dyn PageFetch>,
    extractor: ContentExtractor,
    cfg: ResearchConfig,
}

impl WebRetriever {
    /// Builds a retriever with explicit backends in priority order.
    pub fn new(
        backends: Vec<Arc<dyn SearchBackend>>,
        fetcher: Arc<dyn PageFetch>,
        cfg: ResearchConfig,
    ) -> Self {
        Self {
            slots: backends
                .into_iter()
                .map(|backend| BackendSlot {
                    backend,
                    disabled: AtomicBool::new(false),
                })
                .collect(),
            fetcher,
            extractor: ContentExtractor::new(),
            cfg,
        }
    }

    /// Standard setup: Brave (when `BRAVE_API_KEY` is set) then DuckDuckGo.
    pub fn from_env(cfg: ResearchConfig) -> WebResult<Self> {
        let mut backends: Vec<Arc<dyn SearchBackend>> = Vec::new();
        if let Ok(key) = std::env::var("BRAVE_API_KEY") {
            if !key.trim().is_empty() {
                backends.push(Arc::new(BraveSearch::new(&cfg, key)?));
            }
        }
        backends.push(Arc::new(DuckDuckGoSearch::new(&cfg)?));

        let fetcher = Arc::new(HttpFetcher::new(&cfg)?);
        Ok(Self::new(backends, fetcher, cfg))
    }

    /// Searches the backends in priority order and returns ranked results.
    ///
    /// A rate-limited backend is retried on the spot per the bounded backoff
    /// schedule, then disabled for the session; other failures skip straight
    /// to the next backend.
    ///
    /// # Errors
    /// [`WebError::SearchUnavailable`] when every backend failed.
    pub async fn search(
        &self,
        topic: &str,
        language_hint: Option<&str>,
        max_results: usize,
    ) -> WebResult<Vec<SearchResult>> {
        let query = shape_query(topic, language_hint);
        debug!("search: query={:?}", query);

        for slot in &self.slots {
            if slot.disabled.load(Ordering::Relaxed) {
                continue;
            }
            match self.search_one(slot, &query, max_results).await {
                Ok(raw) => {
                    let ranked = rank_results(raw);
                    info!(
                        "search: {} results via {}",
                        ranked.len(),
                        slot.backend.name()
                    );
                    return Ok(ranked);
                }
                Err(e) => {
                    warn!("search: backend {} failed: {}", slot.backend.name(), e);
                }
            }
        }

        Err(WebError::SearchUnavailable)
    }

    async fn search_one(
        &self,
        slot: &BackendSlot,
        query: &str,
        max_results: usize,
    ) -> WebResult<Vec<query::RawResult>> {
        let mut backoff = fetch::Backoff::new(
            self.cfg.max_attempts,
            std::time::Duration::from_millis(self.cfg.backoff_base_ms),
        );
        loop {
            match slot.backend.search(query, max_results).await {
                Err(WebError::RateLimited { retry_after_secs }) => {
                    let Some(delay) = backoff.next_delay() else {
                        slot.disabled.store(true, Ordering::Relaxed);
                        warn!(
                            "search: disabling {} for this session (rate limited)",
                            slot.backend.name()
                        );
                        return Err(WebError::RateLimited { retry_after_secs });
                    };
                    let delay = retry_after_secs
                        .map(std::time::Duration::from_secs)
                        .unwrap_or(delay)
                        .max(delay);
                    debug!(
                        "search: 429 from {}, backing off {:?}",
                        slot.backend.name(),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// Fetches one result and extracts its snippets.
    ///
    /// Fails softly: any fetch or parse problem yields an empty vector.
    pub async fn extract(&self, result: &SearchResult) -> Vec<ExtractedSnippet> {
        match self.fetcher.get(&result.url).await {
            Ok(html) => self.extractor.extract(&result.url, &html),
            Err(e) => {
                warn!("extract: fetch failed for {}: {}", result.url, e);
                Vec::new()
            }
        }
    }

    /// Extracts from every result with bounded concurrency; output order
    /// follows the original search rank.
    pub async fn extract_all(&self, results: &[SearchResult]) -> Vec<ExtractedSnippet> {
        let mut per_result: Vec<(usize, Vec<ExtractedSnippet>)> = stream::iter(results)
            .map(|r| async move { (r.rank, self.extract(r).await) })
            .buffer_unordered(self.cfg.fetch_concurrency.max(1))
            .collect()
            .await;

        per_result.sort_by_key(|(rank, _)| *rank);

        let snippets: Vec<ExtractedSnippet> = per_result
            .into_iter()
            .flat_map(|(_, s)| s)
            .collect();
        info!(
            "extract_all: {} snippets from {} pages",
            snippets.len(),
            results.len()
        );
        snippets
    }
}
