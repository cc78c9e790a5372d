//! Extraction invocation and defensive parsing of model output.
//!
//! Completions frequently arrive wrapped in prose ("Sure! Here is the
//! JSON you asked for: ...") or with the payload truncated at one end.
//! Parsing therefore never trusts the whole string: it locates the first
//! balanced JSON value around a required anchor key and treats anything
//! unparseable as "no data extracted" for that chunk alone.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use execintel_shared::{Article, Executive, Result};

use crate::backend::CompletionBackend;
use crate::templates::TemplateRegistry;

// ---------------------------------------------------------------------------
// Invoker
// ---------------------------------------------------------------------------

/// Renders a named template and invokes the completion backend.
#[derive(Clone)]
pub struct Invoker {
    registry: Arc<TemplateRegistry>,
    backend: Arc<dyn CompletionBackend>,
}

impl Invoker {
    /// Create an invoker over a compiled registry and a backend.
    pub fn new(registry: Arc<TemplateRegistry>, backend: Arc<dyn CompletionBackend>) -> Self {
        Self { registry, backend }
    }

    /// Render `template` with `args` and return the raw completion text.
    #[instrument(skip(self, args))]
    pub async fn invoke(&self, template: &str, args: &HashMap<String, String>) -> Result<String> {
        let prompt = self.registry.render(template, args)?;
        let raw = self.backend.complete(&prompt).await?;
        debug!(raw_len = raw.len(), "completion received");
        Ok(raw)
    }
}

// ---------------------------------------------------------------------------
// Defensive JSON parsing
// ---------------------------------------------------------------------------

/// Locate and parse the first balanced JSON value in `raw` that contains
/// `anchor` (a required key such as `"name"`).
///
/// Candidate starts are every `{`/`[` at or before the anchor, outermost
/// first, so an executive array is preferred over the first object inside
/// it. As a last resort the opening brace is synthesized before the anchor,
/// which recovers output where the model dropped it.
pub fn extract_json_value(raw: &str, anchor: &str) -> Option<Value> {
    let anchor_idx = raw.find(anchor)?;

    for (idx, ch) in raw.char_indices() {
        if idx > anchor_idx {
            break;
        }
        if ch != '{' && ch != '[' {
            continue;
        }
        if let Some(end) = balanced_end(raw, idx) {
            if end > anchor_idx {
                if let Ok(value) = serde_json::from_str(&raw[idx..=end]) {
                    return Some(value);
                }
            }
        }
    }

    // The backend sometimes drops the opening brace entirely.
    let synthesized = format!("{{{}", &raw[anchor_idx..]);
    let end = balanced_end(&synthesized, 0)?;
    serde_json::from_str(&synthesized[..=end]).ok()
}

/// Byte index of the bracket closing the value that opens at `start`,
/// skipping over string literals. `None` if the value never closes.
fn balanced_end(s: &str, start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let close = match bytes.get(start)? {
        b'{' => b'}',
        b'[' => b']',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (b == close).then_some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse one chunk's discovery output into executives.
///
/// Accepts either a JSON array of executives or a bare object (treated as a
/// one-element list). Returns `None` when nothing parseable is present —
/// the chunk simply contributes nothing.
pub fn parse_executives(raw: &str) -> Option<Vec<Executive>> {
    let value = extract_json_value(raw, "\"name\"")?;
    match value {
        Value::Array(_) => serde_json::from_value(value).ok(),
        Value::Object(_) => {
            let exec: Executive = serde_json::from_value(value).ok()?;
            Some(vec![exec])
        }
        _ => None,
    }
}

/// Parse one chunk's enrichment output into a single executive record.
pub fn parse_executive(raw: &str) -> Option<Executive> {
    parse_executives(raw)?.into_iter().next()
}

/// Parse an article summarization result.
///
/// Prefers the structured `{title, summary, insights}` shape; falls back to
/// treating the whole completion as the summary. A blank completion (or a
/// structured result with a blank summary) drops the article: `None`.
pub fn parse_article(raw: &str, url: &str) -> Option<Article> {
    if let Some(value) = extract_json_value(raw, "\"summary\"") {
        if let Ok(mut article) = serde_json::from_value::<Article>(value) {
            if !article.summary.trim().is_empty() {
                article.url = url.to_string();
                return Some(article);
            }
        }
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(Article {
        url: url.to_string(),
        summary: trimmed.to_string(),
        ..Article::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_array() {
        let raw = r#"[{"name": "Jane Doe", "title": "CEO"}, {"name": "John Smith", "title": "CFO"}]"#;
        let execs = parse_executives(raw).expect("parse");
        assert_eq!(execs.len(), 2);
        assert_eq!(execs[0].name, "Jane Doe");
        assert_eq!(execs[1].title, "CFO");
    }

    #[test]
    fn parses_array_wrapped_in_prose() {
        let raw = "Sure! Here are the executives I found:\n\n[\n  {\"name\": \"Jane Doe\", \"title\": \"CEO\"}\n]\n\nLet me know if you need more.";
        let execs = parse_executives(raw).expect("parse");
        assert_eq!(execs.len(), 1);
        assert_eq!(execs[0].name, "Jane Doe");
    }

    #[test]
    fn prefers_outer_array_over_inner_object() {
        let raw = r#"prose [{"name": "A", "title": "CEO"}, {"name": "B", "title": "CFO"}] trailing"#;
        let execs = parse_executives(raw).expect("parse");
        assert_eq!(execs.len(), 2);
    }

    #[test]
    fn recovers_object_with_missing_opening_brace() {
        // The backend occasionally emits from the first key onward.
        let raw = r#"certainly: "name": "Jane Doe", "biography": "30 years at Acme."}"#;
        let exec = parse_executive(raw).expect("parse");
        assert_eq!(exec.name, "Jane Doe");
        assert_eq!(exec.biography, "30 years at Acme.");
    }

    #[test]
    fn brackets_inside_strings_do_not_confuse_the_scan() {
        let raw = r#"{"name": "Jane {CEO} Doe", "title": "Chief [interim] Officer"}"#;
        let exec = parse_executive(raw).expect("parse");
        assert_eq!(exec.name, "Jane {CEO} Doe");
    }

    #[test]
    fn malformed_output_is_no_data() {
        assert!(parse_executives("no json here at all").is_none());
        assert!(parse_executives(r#"{"name": "Jane", unterminated"#).is_none());
        assert!(parse_executives("").is_none());
    }

    #[test]
    fn anchor_must_be_present() {
        // Valid JSON, wrong shape: no "name" key anywhere.
        assert!(parse_executives(r#"{"error": "rate limited"}"#).is_none());
    }

    #[test]
    fn article_parses_structured_result() {
        let raw = r#"{"title": "Acme Q2", "summary": "Solid quarter.", "insights": "Revenue up\nMargins flat"}"#;
        let article = parse_article(raw, "https://news.example/acme").expect("parse");
        assert_eq!(article.url, "https://news.example/acme");
        assert_eq!(article.title, "Acme Q2");
        assert_eq!(article.insight_lines().len(), 2);
    }

    #[test]
    fn article_falls_back_to_plain_text() {
        let article = parse_article("Acme had a solid quarter.", "https://news.example/a").expect("parse");
        assert_eq!(article.summary, "Acme had a solid quarter.");
        assert!(article.title.is_empty());
    }

    #[test]
    fn blank_article_result_is_dropped() {
        assert!(parse_article("", "https://news.example/a").is_none());
        assert!(parse_article("   \n", "https://news.example/a").is_none());
    }

    #[test]
    fn structured_article_with_blank_summary_falls_back_to_raw_text() {
        let raw = r#"{"title": "T", "summary": "", "insights": ""}"#;
        // The structured shape is blank, but the completion itself is not.
        let article = parse_article(raw, "https://news.example/a").expect("parse");
        assert_eq!(article.summary, raw);
    }
}
