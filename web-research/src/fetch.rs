//! Page fetching with per-host spacing and a bounded backoff machine.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ResearchConfig;
use crate::errors::{WebError, WebResult};
use crate::query::domain_of;

/// HTTP fetch seam: one URL in, the response body out.
#[async_trait]
pub trait PageFetch: Send + Sync {
    async fn get(&self, url: &str) -> WebResult<String>;
}

/// Bounded-attempt exponential backoff.
///
/// Explicit state instead of an open-ended sleep loop: the attempt counter
/// and delay schedule keep worst-case latency computable.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl Backoff {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            base_delay,
        }
    }

    /// Next delay, doubling per attempt; `None` once attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let delay = self.base_delay * 2u32.saturating_pow(self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempt
    }
}

/// Real fetcher: reqwest client + per-host minimum spacing + backoff on 429.
pub struct HttpFetcher {
    client: reqwest::Client,
    spacing: Duration,
    backoff_base: Duration,
    max_attempts: u32,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl HttpFetcher {
    pub fn new(cfg: &ResearchConfig) -> WebResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            spacing: Duration::from_millis(cfg.fetch_spacing_ms),
            backoff_base: Duration::from_millis(cfg.backoff_base_ms),
            max_attempts: cfg.max_attempts,
            last_request: Mutex::new(HashMap::new()),
        })
    }

    /// Waits out the remainder of the spacing window for `host`, then
    /// stamps it. Holding the map lock only to compute the wait keeps
    /// unrelated hosts unblocked.
    async fn respect_spacing(&self, host: &str) {
        let wait = {
            let mut last = self.last_request.lock().await;
            let now = Instant::now();
            let wait = last
                .get(host)
                .map(|slot| (*slot + self.spacing).saturating_duration_since(now))
                .unwrap_or(Duration::ZERO);
            // Reserve the slot so concurrent fetches to this host queue up
            // behind it instead of all firing after the same wait.
            last.insert(host.to_string(), now + wait);
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    async fn get_once(&self, url: &str) -> WebResult<String> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        if status == 429 {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(WebError::RateLimited { retry_after_secs });
        }
        if !resp.status().is_success() {
            return Err(match status {
                500..=599 => WebError::Server(status),
                _ => WebError::HttpStatus(status),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl PageFetch for HttpFetcher {
    async fn get(&self, url: &str) -> WebResult<String> {
        let host = domain_of(url).to_string();
        let mut backoff = Backoff::new(self.max_attempts, self.backoff_base);

        loop {
            self.respect_spacing(&host).await;
            match self.get_once(url).await {
                Err(WebError::RateLimited { retry_after_secs }) => {
                    let Some(delay) = backoff.next_delay() else {
                        warn!("fetch: giving up on {} after {} rate-limited attempts", host, backoff.attempts_used());
                        return Err(WebError::RateLimited { retry_after_secs });
                    };
                    let delay = retry_after_secs
                        .map(Duration::from_secs)
                        .unwrap_or(delay)
                        .max(delay);
                    debug!("fetch: 429 from {}, backing off {:?}", host, delay);
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_is_bounded() {
        let mut b = Backoff::new(3, Duration::from_millis(250));
        assert_eq!(b.next_delay(), Some(Duration::from_millis(250)));
        assert_eq!(b.next_delay(), Some(Duration::from_millis(500)));
        assert_eq!(b.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(b.next_delay(), None);
        assert_eq!(b.attempts_used(), 3);
    }

    #[test]
    fn zero_attempts_never_delays() {
        let mut b = Backoff::new(0, Duration::from_millis(250));
        assert_eq!(b.next_delay(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_queues_same_host_fetches() {
        let fetcher = HttpFetcher::new(&ResearchConfig {
            fetch_spacing_ms: 1000,
            ..ResearchConfig::default()
        })
        .unwrap();

        let t0 = Instant::now();
        fetcher.respect_spacing("a.example").await;
        fetcher.respect_spacing("a.example").await;
        fetcher.respect_spacing("a.example").await;
        // Two full spacing windows must have elapsed (auto-advanced clock).
        assert!(t0.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn different_hosts_do_not_wait_on_each_other() {
        let fetcher = HttpFetcher::new(&ResearchConfig {
            fetch_spacing_ms: 1000,
            ..ResearchConfig::default()
        })
        .unwrap();

        let t0 = Instant::now();
        fetcher.respect_spacing("a.example").await;
        fetcher.respect_spacing("b.example").await;
        assert!(t0.elapsed() < Duration::from_millis(1000));
    }
}
