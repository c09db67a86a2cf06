//! Prompt assembly and defensive reply parsing.
//!
//! The prompt is bounded: combined snippet and commit text must stay under
//! the configured character ceiling. Whole lowest-ranked items are dropped
//! first; an item is never cut mid-body. The reply contract is "ONLY a JSON
//! array"; anything else is carried into [`ModelReply::Fallback`] instead of
//! failing the report.

use commit_index::CommitRecord;
use serde::Deserialize;
use tracing::debug;
use web_research::types::ExtractedSnippet;

use crate::report::{ComparisonSection, MatchedCommit, ModelReply};

/// Inputs that survived the budget, in rank order.
pub struct BudgetedInputs<'a> {
    pub snippets: Vec<&'a ExtractedSnippet>,
    pub commits: Vec<&'a (MatchedCommit, CommitRecord)>,
    /// Whole items dropped to fit the ceiling.
    pub dropped: usize,
}

fn snippet_len(s: &ExtractedSnippet) -> usize {
    s.code_block.len() + s.surrounding_context.len()
}

fn commit_len(c: &CommitRecord) -> usize {
    c.message.len() + c.diff_text.len()
}

/// Applies the ceiling: drops whole items, lowest rank first, until the
/// combined text fits. On an equal-rank tie the snippet goes first — the
/// user's own commits anchor the comparison.
pub fn apply_budget<'a>(
    snippets: &'a [ExtractedSnippet],
    commits: &'a [(MatchedCommit, CommitRecord)],
    budget: usize,
) -> BudgetedInputs<'a> {
    let mut kept_snippets: Vec<&ExtractedSnippet> = snippets.iter().collect();
    let mut kept_commits: Vec<&(MatchedCommit, CommitRecord)> = commits.iter().collect();

    let mut total: usize = kept_snippets.iter().map(|s| snippet_len(s)).sum::<usize>()
        + kept_commits.iter().map(|(_, r)| commit_len(r)).sum::<usize>();
    let mut dropped = 0usize;

    while total > budget && (!kept_snippets.is_empty() || !kept_commits.is_empty()) {
        // Ranks are positions, so the tail of each list is its lowest-ranked
        // item; drop whichever tail ranks lower overall.
        let snippet_rank = kept_snippets.len().checked_sub(1);
        let commit_rank = kept_commits
            .last()
            .map(|(m, _)| m.rank);

        let drop_snippet = match (snippet_rank, commit_rank) {
            (Some(s), Some(c)) => s >= c,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        if drop_snippet {
            let s = kept_snippets.pop().expect("non-empty by branch");
            total -= snippet_len(s);
        } else {
            let (_, r) = kept_commits.pop().expect("non-empty by branch");
            total -= commit_len(r);
        }
        dropped += 1;
    }

    if dropped > 0 {
        debug!(
            "prompt budget: dropped {} whole items to fit {} chars",
            dropped, budget
        );
    }

    BudgetedInputs {
        snippets: kept_snippets,
        commits: kept_commits,
        dropped,
    }
}

/// Builds the grounded comparison prompt.
pub fn build_prompt(topic: &str, language_hint: Option<&str>, inputs: &BudgetedInputs<'_>) -> String {
    let mut s = String::new();
    s.push_str("You are a code review assistant comparing a developer's own commits against current practice found on the web.\n");
    s.push_str(&format!("Topic: {}\n", topic));
    if let Some(lang) = language_hint {
        s.push_str(&format!("Language: {}\n", lang));
    }

    if !inputs.commits.is_empty() {
        s.push_str("\n# The developer's commits\n");
        for (matched, record) in &inputs.commits {
            s.push_str(&format!(
                "\n## Commit {} (relevance {:.2})\nMessage: {}\n```diff\n{}\n```\n",
                record.id, matched.similarity_score, record.message, record.diff_text
            ));
        }
    }

    if !inputs.snippets.is_empty() {
        s.push_str("\n# Examples from the web\n");
        for snippet in &inputs.snippets {
            s.push_str(&format!("\n## Source: {}\n", snippet.source_url));
            if !snippet.surrounding_context.is_empty() {
                s.push_str(&format!("Context: {}\n", snippet.surrounding_context));
            }
            let fence_lang = snippet.language_hint.as_deref().unwrap_or("code");
            s.push_str(&format!("```{}\n{}\n```\n", fence_lang, snippet.code_block));
        }
    }

    s.push_str(
        "\n# Instructions\n\
         Compare the developer's commits with the web examples, aspect by aspect.\n\
         Return ONLY a JSON array (no markdown, no comments) of objects with this exact shape:\n\
         [{\"aspect\": \"...\", \"web_practice_summary\": \"...\", \"local_code_observation\": \"...\", \"recommendation\": \"...\"}]\n\
         Keep each field to one or two sentences. Reference commit ids and sources where possible.\n",
    );
    s
}

/// Trims common code-fence wrappers around a JSON reply.
fn cleanup_json_like(s: &str) -> String {
    let mut t = s.trim().to_string();
    if t.starts_with("```") {
        t = t
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .to_string();
        if let Some(pos) = t.rfind("```") {
            t.truncate(pos);
        }
    }
    t.trim().to_string()
}

#[derive(Deserialize)]
struct SectionsWrapper {
    sections: Vec<ComparisonSection>,
}

/// Parses the model's reply into the tagged variant.
///
/// Accepted shapes: a bare JSON array of sections, or an object wrapping it
/// under `"sections"`. Everything else — including an array with missing
/// fields — becomes [`ModelReply::Fallback`] carrying the raw text.
pub fn parse_reply(raw: &str) -> ModelReply {
    let clean = cleanup_json_like(raw);

    if let Ok(sections) = serde_json::from_str::<Vec<ComparisonSection>>(&clean) {
        if !sections.is_empty() {
            return ModelReply::Structured(sections);
        }
    }
    if let Ok(wrapper) = serde_json::from_str::<SectionsWrapper>(&clean) {
        if !wrapper.sections.is_empty() {
            return ModelReply::Structured(wrapper.sections);
        }
    }

    ModelReply::Fallback(raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snippet(rank_marker: &str, code_len: usize) -> ExtractedSnippet {
        ExtractedSnippet {
            source_url: format!("https://example.com/{rank_marker}"),
            code_block: "x".repeat(code_len),
            surrounding_context: String::new(),
            language_hint: None,
        }
    }

    fn commit(rank: usize, diff_len: usize) -> (MatchedCommit, CommitRecord) {
        (
            MatchedCommit {
                commit_id: format!("repoA@{rank}"),
                similarity_score: 0.9 - rank as f32 * 0.1,
                rank,
            },
            CommitRecord {
                id: format!("repoA@{rank}"),
                repo: "repoA".into(),
                hash: format!("{rank}"),
                message: String::new(),
                diff_text: "d".repeat(diff_len),
                author: "dev".into(),
                timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
                changed_files: Vec::new(),
                embedding: None,
            },
        )
    }

    #[test]
    fn under_budget_keeps_everything() {
        let snippets = vec![snippet("a", 100), snippet("b", 100), snippet("c", 100)];
        let commits = vec![commit(0, 100), commit(1, 100)];
        let budgeted = apply_budget(&snippets, &commits, 1000);
        assert_eq!(budgeted.snippets.len(), 3);
        assert_eq!(budgeted.commits.len(), 2);
        assert_eq!(budgeted.dropped, 0);
    }

    #[test]
    fn drops_whole_lowest_ranked_items_first() {
        let snippets = vec![snippet("a", 400), snippet("b", 400), snippet("c", 400)];
        let commits = vec![commit(0, 400), commit(1, 400)];
        // 2000 total, ceiling 1300: must drop exactly two whole items,
        // and they must be the lowest-ranked ones.
        let budgeted = apply_budget(&snippets, &commits, 1300);
        assert_eq!(budgeted.dropped, 2);

        let total: usize = budgeted.snippets.iter().map(|s| s.code_block.len()).sum::<usize>()
            + budgeted.commits.iter().map(|(_, r)| r.diff_text.len()).sum::<usize>();
        assert!(total <= 1300);

        // Snippet rank 2 goes first, then the rank-1 tie resolves to the
        // snippet again; both commits survive.
        assert_eq!(budgeted.snippets.len(), 1);
        assert_eq!(budgeted.commits.len(), 2);
    }

    #[test]
    fn never_cuts_an_item_in_half() {
        let snippets = vec![snippet("a", 999)];
        let commits = vec![commit(0, 999)];
        let budgeted = apply_budget(&snippets, &commits, 1000);
        // One item must go entirely; the survivor is intact.
        assert_eq!(budgeted.dropped, 1);
        assert_eq!(budgeted.commits.len(), 1);
        assert_eq!(budgeted.commits[0].1.diff_text.len(), 999);
        assert!(budgeted.snippets.is_empty());
    }

    #[test]
    fn prompt_contains_all_budgeted_items() {
        let snippets = vec![snippet("a", 50), snippet("b", 50), snippet("c", 50)];
        let commits = vec![commit(0, 50), commit(1, 50)];
        let budgeted = apply_budget(&snippets, &commits, 10_000);
        let prompt = build_prompt("rate limiting", Some("rust"), &budgeted);

        assert!(prompt.contains("repoA@0"));
        assert!(prompt.contains("repoA@1"));
        assert!(prompt.contains("https://example.com/a"));
        assert!(prompt.contains("https://example.com/c"));
        assert!(prompt.contains("ONLY a JSON array"));
    }

    #[test]
    fn parses_bare_array_reply() {
        let raw = r#"[{"aspect":"a","web_practice_summary":"w","local_code_observation":"l","recommendation":"r"}]"#;
        match parse_reply(raw) {
            ModelReply::Structured(sections) => {
                assert_eq!(sections.len(), 1);
                assert_eq!(sections[0].aspect, "a");
            }
            ModelReply::Fallback(_) => panic!("expected structured"),
        }
    }

    #[test]
    fn parses_fenced_wrapped_reply() {
        let raw = "```json\n{\"sections\":[{\"aspect\":\"a\",\"web_practice_summary\":\"w\",\"local_code_observation\":\"l\",\"recommendation\":\"r\"}]}\n```";
        assert!(matches!(parse_reply(raw), ModelReply::Structured(_)));
    }

    #[test]
    fn missing_fields_fall_back_to_raw() {
        let raw = r#"[{"aspect":"a"}]"#;
        assert!(matches!(parse_reply(raw), ModelReply::Fallback(_)));
    }

    #[test]
    fn prose_falls_back_to_raw() {
        assert!(matches!(
            parse_reply("Overall your code looks fine."),
            ModelReply::Fallback(_)
        ));
    }
}
