//! The review pipeline: topic in, grounded comparison report out.
//!
//! Flow for one `review` call:
//!
//! 1) **Validate** — blank topics and scopes naming untracked repositories
//!    fail fast, before any external call.
//! 2) **Research + match, concurrently** — the web arm searches the
//!    configured backends and extracts code from the top pages
//!    (`SEARCHING → EXTRACTING`), while the matcher ranks local commits via
//!    the embedding index (`MATCHING`). Both arms join before synthesis.
//! 3) **Synthesize** — budgeted prompt from both arms, one call to the
//!    local model, defensive parse into sections (`SYNTHESIZING`).
//! 4) **Report** — always. Failed sub-steps become `degraded_reasons`
//!    entries; the one exception is both arms coming back empty, which
//!    short-circuits to a terminal report without touching the model.
//!
//! The pipeline uses `tracing` for stage logging and enum/trait seams from
//! the leaf crates; expected external failures never escape `review`.

pub mod errors;
pub mod matcher;
pub mod prompt;
pub mod render;
pub mod report;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use commit_index::{CommitRecord, CommitStore, EmbedSummary, EmbeddingIndex, IndexError, RepoScope};
use llm_service::TextGenerator;
use web_research::WebRetriever;
use web_research::types::ExtractedSnippet;

pub use errors::{ReviewError, ReviewResult};
pub use render::to_markdown;
pub use report::{ComparisonSection, MatchedCommit, ModelReply, ReviewReport, degraded};

/// Pipeline stages, in nominal order. `Degraded` is reachable from any of
/// them; it marks the terminal no-comparison path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Searching,
    Extracting,
    Matching,
    Synthesizing,
    Done,
    Degraded,
}

/// Tuning for one pipeline instance.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Search results requested per review.
    pub max_web_results: usize,
    /// Top-ranked pages actually fetched for extraction.
    pub max_pages: usize,
    /// Commits matched per review (`k` for the index query).
    pub max_commits: usize,
    /// Character ceiling for combined snippet + commit text in the prompt.
    pub prompt_budget: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_web_results: 10,
            max_pages: 5,
            max_commits: 5,
            prompt_budget: 12_000,
        }
    }
}

impl ReviewConfig {
    /// Env-backed construction: `REVIEW_MAX_WEB_RESULTS`, `REVIEW_MAX_PAGES`,
    /// `REVIEW_MAX_COMMITS`, `REVIEW_PROMPT_BUDGET`.
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str, default: T) -> T {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        }
        let d = Self::default();
        Self {
            max_web_results: var("REVIEW_MAX_WEB_RESULTS", d.max_web_results),
            max_pages: var("REVIEW_MAX_PAGES", d.max_pages),
            max_commits: var("REVIEW_MAX_COMMITS", d.max_commits),
            prompt_budget: var("REVIEW_PROMPT_BUDGET", d.prompt_budget),
        }
    }
}

/// The assembled pipeline. Built once at startup; the index is mutated only
/// through `embed_all`, read through queries.
pub struct ReviewPipeline {
    store: CommitStore,
    index: Arc<EmbeddingIndex>,
    retriever: WebRetriever,
    generator: Arc<dyn TextGenerator>,
    cfg: ReviewConfig,
}

impl ReviewPipeline {
    pub fn new(
        store: CommitStore,
        index: Arc<EmbeddingIndex>,
        retriever: WebRetriever,
        generator: Arc<dyn TextGenerator>,
        cfg: ReviewConfig,
    ) -> Self {
        Self {
            store,
            index,
            retriever,
            generator,
            cfg,
        }
    }

    /// Read access to the journal for callers that render commit details.
    pub fn store(&self) -> &CommitStore {
        &self.store
    }

    /// Runs the full review for `topic`.
    ///
    /// Always returns a report for expected external failures; see the
    /// crate docs for the degradation rules.
    ///
    /// # Errors
    /// [`ReviewError::Configuration`] for a blank topic or a scope naming an
    /// untracked repository — raised before any external call.
    pub async fn review(
        &self,
        topic: &str,
        language_hint: Option<&str>,
        scope: &RepoScope,
    ) -> ReviewResult<ReviewReport> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ReviewError::Configuration("topic must not be blank".into()));
        }
        self.validate_scope(scope)?;

        let t0 = Instant::now();
        info!("review: topic={:?} scope={:?}", topic, scope);

        let mut degraded_reasons: BTreeSet<String> = BTreeSet::new();

        // Both retrieval arms are independent; join before synthesis.
        debug!("review: stage={:?}", Stage::Matching);
        let (web, matched) = tokio::join!(
            self.research(topic, language_hint),
            matcher::match_commits(&self.index, topic, scope, self.cfg.max_commits),
        );

        let (snippets, web_sources, web_reason) = web;
        if let Some(reason) = web_reason {
            degraded_reasons.insert(reason.to_string());
        }

        let matched = match matched {
            Ok(m) => m,
            Err(e) => {
                warn!("review: commit matching failed: {}", e);
                degraded_reasons.insert(degraded::COMMIT_MATCHING_UNAVAILABLE.to_string());
                Vec::new()
            }
        };

        // Total loss of both arms: terminal report, model never called.
        if snippets.is_empty() && matched.is_empty() {
            debug!("review: stage={:?}", Stage::Degraded);
            degraded_reasons.insert(degraded::NOTHING_TO_COMPARE.to_string());
            info!("review: degraded with nothing to compare ({} ms)", t0.elapsed().as_millis());
            return Ok(self.finish(topic, Vec::new(), degraded_reasons, matched, web_sources));
        }

        debug!("review: stage={:?}", Stage::Synthesizing);
        let sections = self
            .synthesize(topic, language_hint, &snippets, &matched, &mut degraded_reasons)
            .await;

        let stage = if degraded_reasons.is_empty() {
            Stage::Done
        } else {
            Stage::Degraded
        };
        info!(
            "review: stage={:?} sections={} degraded={} in {} ms",
            stage,
            sections.len(),
            degraded_reasons.len(),
            t0.elapsed().as_millis()
        );

        Ok(self.finish(topic, sections, degraded_reasons, matched, web_sources))
    }

    /// Ranked semantic lookup over the journal, no synthesis.
    ///
    /// # Errors
    /// - [`ReviewError::Configuration`] for blank queries or unknown scope.
    /// - [`ReviewError::EmbeddingUnavailable`] when the backend is down and
    ///   the index is non-empty (an empty index returns an empty vec).
    pub async fn semantic_search(
        &self,
        query: &str,
        k: usize,
        scope: &RepoScope,
    ) -> ReviewResult<Vec<MatchedCommit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ReviewError::Configuration("query must not be blank".into()));
        }
        self.validate_scope(scope)?;

        matcher::match_commits(&self.index, query, scope, k)
            .await
            .map_err(|e| match e {
                IndexError::NotFound(id) => ReviewError::NotFound(id),
                other => ReviewError::EmbeddingUnavailable(other.to_string()),
            })
    }

    /// Embeds every unembedded commit in scope; per-record backend failures
    /// are counted as skipped, never fatal.
    ///
    /// # Errors
    /// [`ReviewError::Configuration`] for an unknown scope repository.
    pub async fn embed_all(
        &mut self,
        scope: &RepoScope,
        concurrency: usize,
    ) -> ReviewResult<EmbedSummary> {
        self.validate_scope(scope)?;
        Ok(commit_index::embed_all(&mut self.store, &self.index, scope, concurrency).await)
    }

    fn validate_scope(&self, scope: &RepoScope) -> ReviewResult<()> {
        for repo in scope {
            if !self.store.has_repo(repo) {
                return Err(ReviewError::Configuration(format!(
                    "unknown repository in scope: {repo}"
                )));
            }
        }
        Ok(())
    }

    /// The web arm: search, then extract from the top pages.
    /// Returns snippets, deduplicated source urls, and an optional
    /// degradation marker.
    async fn research(
        &self,
        topic: &str,
        language_hint: Option<&str>,
    ) -> (Vec<ExtractedSnippet>, Vec<String>, Option<&'static str>) {
        debug!("review: stage={:?}", Stage::Searching);
        let results = match self
            .retriever
            .search(topic, language_hint, self.cfg.max_web_results)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("review: web search failed: {}", e);
                return (Vec::new(), Vec::new(), Some(degraded::WEB_SEARCH_UNAVAILABLE));
            }
        };

        debug!("review: stage={:?}", Stage::Extracting);
        let top = &results[..results.len().min(self.cfg.max_pages)];
        let snippets = self.retriever.extract_all(top).await;

        let mut sources: Vec<String> = Vec::new();
        for s in &snippets {
            if !sources.contains(&s.source_url) {
                sources.push(s.source_url.clone());
            }
        }

        if snippets.is_empty() {
            (Vec::new(), Vec::new(), Some(degraded::NO_SNIPPETS_EXTRACTED))
        } else {
            (snippets, sources, None)
        }
    }

    /// Builds the budgeted prompt, calls the model once, parses defensively.
    async fn synthesize(
        &self,
        topic: &str,
        language_hint: Option<&str>,
        snippets: &[ExtractedSnippet],
        matched: &[MatchedCommit],
        degraded_reasons: &mut BTreeSet<String>,
    ) -> Vec<ComparisonSection> {
        // Resolve weak references; a missing record means the index is ahead
        // of the journal, which is worth a warning but not an abort.
        let mut commits: Vec<(MatchedCommit, CommitRecord)> = Vec::with_capacity(matched.len());
        for m in matched {
            match self.store.get_commit(&m.commit_id) {
                Ok(record) => commits.push((m.clone(), record.clone())),
                Err(e) => warn!("review: matched commit not in journal: {}", e),
            }
        }

        let budgeted = prompt::apply_budget(snippets, &commits, self.cfg.prompt_budget);
        let text = prompt::build_prompt(topic, language_hint, &budgeted);

        let raw = match self.generator.generate(&text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("review: language model call failed: {}", e);
                degraded_reasons.insert(degraded::MODEL_UNAVAILABLE.to_string());
                return Vec::new();
            }
        };

        match prompt::parse_reply(&raw) {
            ModelReply::Structured(sections) => sections,
            ModelReply::Fallback(raw) => {
                degraded_reasons.insert(degraded::MODEL_UNSTRUCTURED.to_string());
                vec![ComparisonSection {
                    aspect: format!("{topic} (unstructured model reply)"),
                    web_practice_summary: truncate_chars(&raw, 1200),
                    local_code_observation: String::new(),
                    recommendation: String::new(),
                }]
            }
        }
    }

    fn finish(
        &self,
        topic: &str,
        comparison_sections: Vec<ComparisonSection>,
        degraded_reasons: BTreeSet<String>,
        matched_commits: Vec<MatchedCommit>,
        web_sources: Vec<String>,
    ) -> ReviewReport {
        ReviewReport {
            topic: topic.to_string(),
            generated_at: Utc::now(),
            comparison_sections,
            degraded_reasons,
            matched_commits,
            web_sources,
        }
    }
}

fn truncate_chars(s: &str, n: usize) -> String {
    if s.chars().count() <= n {
        return s.to_string();
    }
    s.chars().take(n).collect::<String>() + "…"
}
