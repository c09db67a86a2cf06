//! Readable-text and code extraction from fetched pages.
//!
//! Regex surgery, not a DOM: drop the boilerplate containers, pull
//! `<pre>`-delimited regions as code, keep the prose immediately before a
//! region as its context. Good enough for documentation pages, Stack
//! Overflow and blogs, and it degrades to "no snippets" instead of erroring
//! on hostile markup.

use regex::Regex;
use tracing::trace;

use crate::types::ExtractedSnippet;

/// Shortest code block worth keeping; anything below is inline fragments.
const MIN_CODE_LEN: usize = 30;

/// Longest context window kept per snippet, in characters.
const MAX_CONTEXT_LEN: usize = 240;

pub struct ContentExtractor {
    boilerplate: Regex,
    pre_block: Regex,
    lang_class: Regex,
    tag: Regex,
}

impl ContentExtractor {
    pub fn new() -> Self {
        // (?is): case-insensitive, dot matches newlines.
        let boilerplate = Regex::new(
            r"(?is)<(script|style|nav|header|footer|aside|noscript)\b.*?</(script|style|nav|header|footer|aside|noscript)>",
        )
        .expect("static regex");
        let pre_block = Regex::new(r"(?is)<pre\b[^>]*>(.*?)</pre>").expect("static regex");
        let lang_class =
            Regex::new(r#"(?i)class="[^"]*(?:language|lang)-([a-z0-9+#]+)"#).expect("static regex");
        let tag = Regex::new(r"(?s)<[^>]+>").expect("static regex");
        Self {
            boilerplate,
            pre_block,
            lang_class,
            tag,
        }
    }

    /// Extracts code regions with surrounding prose from one page.
    ///
    /// Whitespace-only and too-short regions are dropped here, so the
    /// non-empty `code_block` invariant holds for everything returned.
    pub fn extract(&self, url: &str, html: &str) -> Vec<ExtractedSnippet> {
        let page = self.boilerplate.replace_all(html, " ");

        let mut snippets = Vec::new();
        let mut prev_end = 0usize;

        for caps in self.pre_block.captures_iter(&page) {
            let whole = caps.get(0).expect("group 0 always present");
            let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

            let code = normalize_code(&self.strip_tags(inner));
            let context = self.context_before(&page[prev_end..whole.start()]);
            prev_end = whole.end();

            if code.trim().len() < MIN_CODE_LEN {
                trace!("extract: dropping short block from {}", url);
                continue;
            }

            let language_hint = self
                .lang_class
                .captures(whole.as_str())
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_lowercase())
                .or_else(|| detect_language(&code));

            snippets.push(ExtractedSnippet {
                source_url: url.to_string(),
                code_block: code,
                surrounding_context: context,
                language_hint,
            });
        }

        trace!("extract: {} snippets from {}", snippets.len(), url);
        snippets
    }

    fn strip_tags(&self, html: &str) -> String {
        decode_entities(&self.tag.replace_all(html, ""))
    }

    /// Prose immediately before a code region, flattened to one line.
    fn context_before(&self, html: &str) -> String {
        let text = self.strip_tags(html);
        let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.len() <= MAX_CONTEXT_LEN {
            return flat;
        }
        // Keep the tail: the sentences closest to the code block.
        let mut cut = flat.len() - MAX_CONTEXT_LEN;
        while !flat.is_char_boundary(cut) {
            cut += 1;
        }
        let tail = &flat[cut..];
        match tail.find(' ') {
            Some(space) => tail[space + 1..].to_string(),
            None => tail.to_string(),
        }
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Trims trailing whitespace per line and blank lines at both ends.
fn normalize_code(code: &str) -> String {
    let lines: Vec<&str> = code.lines().map(str::trim_end).collect();
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(start);
    lines[start..end].join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Keyword heuristics when no language class is present.
fn detect_language(code: &str) -> Option<String> {
    let hit = if code.contains("fn ") && (code.contains("let ") || code.contains("impl ")) {
        "rust"
    } else if code.contains("def ") || code.contains("import ") && code.contains(":") {
        "python"
    } else if code.contains("function") || code.contains("const ") || code.contains("=>") {
        "javascript"
    } else if code.contains("public class") || code.contains("System.out") {
        "java"
    } else if code.contains("func ") || code.contains("package main") {
        "go"
    } else if code.contains("#include") || code.contains("int main") {
        "c"
    } else {
        return None;
    };
    Some(hit.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head><style>body { color: red }</style></head>
        <nav><a href="/">home</a></nav>
        <body>
        <p>When limiting request rates, always use a token bucket. For example:</p>
        <pre><code class="language-rust">fn take(&amp;mut self) -> bool {
    let now = Instant::now();
    self.refill(now);
    self.tokens >= 1.0
}</code></pre>
        <p>Short inline:</p>
        <pre>x = 1</pre>
        <footer>copyright</footer>
        </body></html>
    "#;

    #[test]
    fn extracts_code_with_context_and_language() {
        let snippets = ContentExtractor::new().extract("https://a.example", PAGE);
        assert_eq!(snippets.len(), 1);

        let s = &snippets[0];
        assert_eq!(s.language_hint.as_deref(), Some("rust"));
        assert!(s.code_block.contains("fn take(&mut self)"), "entities decoded");
        assert!(s.surrounding_context.contains("token bucket"));
        assert_eq!(s.source_url, "https://a.example");
    }

    #[test]
    fn short_blocks_are_dropped() {
        let html = "<pre>x = 1</pre>";
        assert!(ContentExtractor::new().extract("u", html).is_empty());
    }

    #[test]
    fn boilerplate_never_leaks_into_context() {
        let snippets = ContentExtractor::new().extract("u", PAGE);
        assert!(!snippets[0].surrounding_context.contains("color: red"));
        assert!(!snippets[0].surrounding_context.contains("home"));
    }

    #[test]
    fn whitespace_only_block_is_dropped() {
        let html = "<pre>   \n\n   </pre>";
        assert!(ContentExtractor::new().extract("u", html).is_empty());
    }

    #[test]
    fn normalize_trims_blank_edges_and_trailing_space() {
        let code = "\n\n  let x = 1;   \n  let y = 2;\n\n";
        assert_eq!(normalize_code(code), "  let x = 1;\n  let y = 2;");
    }

    #[test]
    fn detects_language_without_class_attribute() {
        let html = "<pre>def handler(request):\n    return limiter.check(request.ip)</pre>";
        let snippets = ContentExtractor::new().extract("u", html);
        assert_eq!(snippets[0].language_hint.as_deref(), Some("python"));
    }
}
