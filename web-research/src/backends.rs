//! Search backends behind one seam.
//!
//! Two variants ship: the Brave Search API (needs a key, structured JSON)
//! and the DuckDuckGo HTML endpoint (keyless, parsed with regex). The
//! retriever tries them in declared priority order.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::ResearchConfig;
use crate::errors::{WebError, WebResult};
use crate::query::RawResult;

/// A search capability: one query in, raw hits out.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Backend name for logs and degradation notes.
    fn name(&self) -> &str;

    /// Runs the query, returning up to `max_results` raw hits.
    async fn search(&self, query: &str, max_results: usize) -> WebResult<Vec<RawResult>>;
}

/* ==========================
Brave Search API
========================== */

/// Primary backend: `GET https://api.search.brave.com/res/v1/web/search`.
pub struct BraveSearch {
    client: reqwest::Client,
    api_key: String,
}

impl BraveSearch {
    pub fn new(cfg: &ResearchConfig, api_key: String) -> WebResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self { client, api_key })
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: BraveWeb,
}

#[derive(Debug, Default, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveItem>,
}

#[derive(Debug, Deserialize)]
struct BraveItem {
    url: String,
    #[serde(default)]
    title: String,
}

#[async_trait]
impl SearchBackend for BraveSearch {
    fn name(&self) -> &str {
        "brave"
    }

    async fn search(&self, query: &str, max_results: usize) -> WebResult<Vec<RawResult>> {
        debug!("brave search: {:?}", query);
        let resp = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", &max_results.to_string())])
            .send()
            .await?;

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

        let body: BraveResponse = resp
            .json()
            .await
            .map_err(|e| WebError::Decode(format!("brave response: {e}")))?;

        Ok(body
            .web
            .results
            .into_iter()
            .take(max_results)
            .map(|i| RawResult {
                url: i.url,
                title: i.title,
            })
            .collect())
    }
}

/* ==========================
DuckDuckGo HTML endpoint
========================== */

/// Fallback backend: scrapes `https://html.duckduckgo.com/html/`.
/// No key required; results are anchor tags with a `result__a` class.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    result_link: Regex,
    tag: Regex,
}

impl DuckDuckGoSearch {
    pub fn new(cfg: &ResearchConfig) -> WebResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        let result_link =
            Regex::new(r#"<a[^>]*class="[^"]*result__a[^"]*"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
                .map_err(|e| WebError::Decode(e.to_string()))?;
        let tag = Regex::new(r"<[^>]+>").map_err(|e| WebError::Decode(e.to_string()))?;
        Ok(Self {
            client,
            result_link,
            tag,
        })
    }

    fn parse(&self, html: &str, max_results: usize) -> Vec<RawResult> {
        self.result_link
            .captures_iter(html)
            .filter_map(|cap| {
                let url = decode_ddg_redirect(cap.get(1)?.as_str());
                let title = self.tag.replace_all(cap.get(2)?.as_str(), "");
                let title = title.trim();
                if url.starts_with("http") && !title.is_empty() {
                    Some(RawResult {
                        url,
                        title: title.to_string(),
                    })
                } else {
                    None
                }
            })
            .take(max_results)
            .collect()
    }
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>&…`.
fn decode_ddg_redirect(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let tail = &href[pos + 5..];
        let encoded = tail.split('&').next().unwrap_or(tail);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    href.to_string()
}

#[async_trait]
impl SearchBackend for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> WebResult<Vec<RawResult>> {
        debug!("duckduckgo search: {:?}", query);
        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        );
        let resp = self.client.get(&url).send().await?;

        let status = resp.status().as_u16();
        if status == 429 {
            return Err(WebError::RateLimited {
                retry_after_secs: None,
            });
        }
        if !resp.status().is_success() {
            return Err(match status {
                500..=599 => WebError::Server(status),
                _ => WebError::HttpStatus(status),
            });
        }

        let html = resp.text().await?;
        Ok(self.parse(&html, max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ddg_result_anchors() {
        let ddg = DuckDuckGoSearch::new(&ResearchConfig::default()).unwrap();
        let html = r#"
            <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpost&amp;rut=x">A <b>Post</b></a>
            <a class="result__a" href="https://other.example/page">Other</a>
            <a class="nav" href="https://skip.example">skip</a>
        "#;
        let results = ddg.parse(html, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com/post");
        assert_eq!(results[0].title, "A Post");
        assert_eq!(results[1].url, "https://other.example/page");
    }

    #[test]
    fn parse_respects_max_results() {
        let ddg = DuckDuckGoSearch::new(&ResearchConfig::default()).unwrap();
        let html = r#"
            <a class="result__a" href="https://a.example">a</a>
            <a class="result__a" href="https://b.example">b</a>
        "#;
        assert_eq!(ddg.parse(html, 1).len(), 1);
    }

    #[test]
    fn decodes_redirect_urls() {
        assert_eq!(
            decode_ddg_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.example%2Fx&rut=1"),
            "https://a.example/x"
        );
        assert_eq!(
            decode_ddg_redirect("https://direct.example/y"),
            "https://direct.example/y"
        );
    }
}
