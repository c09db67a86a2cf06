//! Retrieval tuning knobs.

/// Configuration for search, fetching and extraction.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Results requested from a search backend.
    pub max_results: usize,
    /// Pages fetched in flight at once during extraction.
    pub fetch_concurrency: usize,
    /// Minimum spacing between fetches to the same host, in milliseconds.
    pub fetch_spacing_ms: u64,
    /// First backoff delay after a 429; doubles per attempt.
    pub backoff_base_ms: u64,
    /// Bounded attempt count for the backoff state machine.
    pub max_attempts: u32,
    /// Per-request timeout in seconds (search and fetch alike).
    pub timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            fetch_concurrency: 4,
            fetch_spacing_ms: 1000,
            backoff_base_ms: 250,
            max_attempts: 3,
            timeout_secs: 30,
            user_agent: "devjournal/0.1 (personal code review assistant)".to_string(),
        }
    }
}

impl ResearchConfig {
    /// Builds a config from environment variables with the defaults above.
    ///
    /// - `REVIEW_MAX_RESULTS`, `REVIEW_FETCH_CONCURRENCY`,
    ///   `REVIEW_FETCH_SPACING_MS`, `REVIEW_BACKOFF_BASE_MS`,
    ///   `REVIEW_MAX_ATTEMPTS`, `REVIEW_FETCH_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str, default: T) -> T {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        }
        let defaults = Self::default();
        Self {
            max_results: var("REVIEW_MAX_RESULTS", defaults.max_results),
            fetch_concurrency: var("REVIEW_FETCH_CONCURRENCY", defaults.fetch_concurrency),
            fetch_spacing_ms: var("REVIEW_FETCH_SPACING_MS", defaults.fetch_spacing_ms),
            backoff_base_ms: var("REVIEW_BACKOFF_BASE_MS", defaults.backoff_base_ms),
            max_attempts: var("REVIEW_MAX_ATTEMPTS", defaults.max_attempts),
            timeout_secs: var("REVIEW_FETCH_TIMEOUT_SECS", defaults.timeout_secs),
            user_agent: defaults.user_agent,
        }
    }
}
