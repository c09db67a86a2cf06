//! Query shaping and authority ranking.
//!
//! Raw journal topics are often commit jargon ("chore", "fix"); searched
//! verbatim they pull in housekeeping articles. The shaper remaps those and
//! pins the query to a software-engineering context. Ranking then orders raw
//! backend hits by source authority so rank 0 is the most citable page.

use crate::types::SearchResult;

/// Builds the search query for a topic: jargon remap, optional language,
/// then technical qualifiers.
pub fn shape_query(topic: &str, language_hint: Option<&str>) -> String {
    let refined = match topic.trim().to_lowercase().as_str() {
        "chore" | "feat" | "fix" => format!("{} git commit message", topic.trim()),
        "refactor" => "code refactoring".to_string(),
        "ci" => "continuous integration".to_string(),
        "docs" => "documentation".to_string(),
        _ => topic.trim().to_string(),
    };

    let mut parts = vec![refined];
    if let Some(lang) = language_hint {
        parts.push(lang.trim().to_string());
    }
    parts.push("best practices".to_string());
    parts.push("software engineering".to_string());
    parts.join(" ")
}

/// Raw hit from a search backend, before ranking.
#[derive(Clone, Debug)]
pub struct RawResult {
    pub url: String,
    pub title: String,
}

/// Orders results by authority score (descending, stable) and assigns ranks.
pub fn rank_results(raw: Vec<RawResult>) -> Vec<SearchResult> {
    let mut scored: Vec<(f32, RawResult)> = raw
        .into_iter()
        .map(|r| (authority_score(&r), r))
        .collect();
    // Stable sort keeps the backend's own ordering within a score band.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .enumerate()
        .map(|(rank, (_, r))| SearchResult {
            url: r.url,
            title: r.title,
            rank,
        })
        .collect()
}

fn authority_score(result: &RawResult) -> f32 {
    let domain = domain_of(&result.url);

    let mut score: f32 = match domain {
        "stackoverflow.com" | "python.org" | "mozilla.org" | "owasp.org" | "rust-lang.org" => 1.0,
        "github.com" | "auth0.com" | "realpython.com" => 0.9,
        "dev.to" => 0.8,
        "medium.com" => 0.7,
        _ => 0.5,
    };

    let title = result.title.to_lowercase();
    if ["documentation", "official", "guide"]
        .iter()
        .any(|kw| title.contains(kw))
    {
        score += 0.2;
    }

    score.min(1.0)
}

/// Host without a leading `www.`; used for source attribution.
pub fn domain_of(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    host.strip_prefix("www.").unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaps_commit_jargon_topics() {
        let q = shape_query("chore", None);
        assert!(q.contains("git commit message"));
        assert!(q.contains("best practices"));
    }

    #[test]
    fn includes_language_hint() {
        let q = shape_query("rate limiting", Some("rust"));
        assert!(q.starts_with("rate limiting rust"));
    }

    #[test]
    fn authoritative_sources_rank_first() {
        let raw = vec![
            RawResult {
                url: "https://randomblog.example/rate-limits".into(),
                title: "my thoughts".into(),
            },
            RawResult {
                url: "https://stackoverflow.com/q/1".into(),
                title: "How to rate limit".into(),
            },
        ];
        let ranked = rank_results(raw);
        assert_eq!(ranked[0].rank, 0);
        assert!(ranked[0].url.contains("stackoverflow"));
        assert_eq!(ranked[1].rank, 1);
    }

    #[test]
    fn domain_strips_scheme_and_www() {
        assert_eq!(domain_of("https://www.github.com/x/y"), "github.com");
        assert_eq!(domain_of("http://dev.to/post?a=1"), "dev.to");
    }
}
