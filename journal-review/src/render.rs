//! Markdown rendering for review reports.

use crate::report::ReviewReport;

/// Renders a report as markdown for display or export.
pub fn to_markdown(report: &ReviewReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# Code Review: {}\n", report.topic));
    lines.push(format!(
        "**Date**: {}\n",
        report.generated_at.format("%Y-%m-%d")
    ));

    lines.push("## Summary\n".to_string());
    lines.push(format!(
        "- **Commits matched**: {}",
        report.matched_commits.len()
    ));
    lines.push(format!("- **Web sources**: {}", report.web_sources.len()));
    lines.push(format!(
        "- **Comparison sections**: {}\n",
        report.comparison_sections.len()
    ));

    if !report.degraded_reasons.is_empty() {
        lines.push("## Degraded\n".to_string());
        for reason in &report.degraded_reasons {
            lines.push(format!("- {}", reason));
        }
        lines.push(String::new());
    }

    if !report.matched_commits.is_empty() {
        lines.push("## Your Commits\n".to_string());
        for m in &report.matched_commits {
            lines.push(format!(
                "- `{}` (relevance {:.2})",
                m.commit_id, m.similarity_score
            ));
        }
        lines.push(String::new());
    }

    for (i, section) in report.comparison_sections.iter().enumerate() {
        lines.push(format!("## {}. {}\n", i + 1, section.aspect));
        if !section.web_practice_summary.is_empty() {
            lines.push(format!("**Web practice**: {}\n", section.web_practice_summary));
        }
        if !section.local_code_observation.is_empty() {
            lines.push(format!(
                "**Your code**: {}\n",
                section.local_code_observation
            ));
        }
        if !section.recommendation.is_empty() {
            lines.push(format!("**Recommendation**: {}\n", section.recommendation));
        }
    }

    if !report.web_sources.is_empty() {
        lines.push("## Sources\n".to_string());
        for url in &report.web_sources {
            lines.push(format!("- <{}>", url));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ComparisonSection, MatchedCommit, degraded};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    #[test]
    fn renders_sections_and_degradations() {
        let report = ReviewReport {
            topic: "rate limiting".into(),
            generated_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            comparison_sections: vec![ComparisonSection {
                aspect: "token bucket".into(),
                web_practice_summary: "refill on read".into(),
                local_code_observation: "fixed window".into(),
                recommendation: "switch to bucket".into(),
            }],
            degraded_reasons: BTreeSet::from([degraded::NO_SNIPPETS_EXTRACTED.to_string()]),
            matched_commits: vec![MatchedCommit {
                commit_id: "repoA@abc".into(),
                similarity_score: 0.81,
                rank: 0,
            }],
            web_sources: vec!["https://example.com".into()],
        };

        let md = to_markdown(&report);
        assert!(md.contains("# Code Review: rate limiting"));
        assert!(md.contains("## 1. token bucket"));
        assert!(md.contains("repoA@abc"));
        assert!(md.contains(degraded::NO_SNIPPETS_EXTRACTED));
        assert!(md.contains("<https://example.com>"));
    }
}
