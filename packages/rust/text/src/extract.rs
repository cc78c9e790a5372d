//! Plain-text extraction from fetched HTML.
//!
//! The pipeline feeds page text to language-model extraction templates, so
//! all we need from a page is readable prose: the main content area with
//! navigation chrome, scripts, and styling stripped out.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Tags whose entire subtree is navigation/boilerplate, never content.
const CHROME_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "svg", "iframe",
];

/// Tags that terminate a line of prose when serialized to plain text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "li", "ul", "ol", "table", "tr", "br", "h1", "h2",
    "h3", "h4", "h5", "h6", "blockquote", "pre",
];

/// Extract readable plain text from an HTML document.
///
/// Prefers the semantic content containers (`main`, `article`,
/// `[role="main"]`, `.content`) and falls back to `body` with chrome
/// stripped. Output is one line per block element, internal whitespace
/// collapsed, blank lines removed.
pub fn extract_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    // Readability heuristics: try the usual content containers first.
    let selectors = ["main", "article", r#"[role="main"]"#, ".content"];
    for sel_str in selectors {
        let sel = Selector::parse(sel_str).unwrap();
        if let Some(el) = doc.select(&sel).next() {
            let text = element_text(el);
            if !text.is_empty() {
                debug!(container = sel_str, len = text.len(), "extracted content text");
                return text;
            }
        }
    }

    // Last resort: the whole body minus chrome.
    let body_sel = Selector::parse("body").unwrap();
    match doc.select(&body_sel).next() {
        Some(body) => element_text(body),
        None => String::new(),
    }
}

/// Collect the normalized text of one element subtree.
fn element_text(el: ElementRef) -> String {
    let mut raw = String::new();
    push_text(el, &mut raw);

    let lines: Vec<String> = raw
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect();

    lines.join("\n")
}

fn push_text(el: ElementRef, out: &mut String) {
    let name = el.value().name();
    if CHROME_TAGS.contains(&name) {
        return;
    }

    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            push_text(child_el, out);
        }
    }

    if BLOCK_TAGS.contains(&name) {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_main_over_body() {
        let html = r#"<html><body>
            <div>Sidebar junk</div>
            <main><h1>Leadership</h1><p>Jane Doe is the CEO.</p></main>
        </body></html>"#;

        let text = extract_text(html);
        assert!(text.contains("Jane Doe is the CEO."));
        assert!(!text.contains("Sidebar junk"));
    }

    #[test]
    fn strips_chrome_from_body_fallback() {
        let html = r#"<html><body>
            <nav><a href="/">Home</a></nav>
            <p>Our executive team.</p>
            <script>analytics();</script>
            <footer>Copyright 2026</footer>
        </body></html>"#;

        let text = extract_text(html);
        assert!(text.contains("Our executive team."));
        assert!(!text.contains("Home"));
        assert!(!text.contains("analytics"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn collapses_whitespace_within_lines() {
        let html = "<html><body><p>Spaced   \t  out   text</p></body></html>";
        assert_eq!(extract_text(html), "Spaced out text");
    }

    #[test]
    fn one_line_per_block_element() {
        let html = r#"<html><body><main>
            <h2>Executives</h2>
            <ul><li>Jane Doe, CEO</li><li>John Smith, CFO</li></ul>
        </main></body></html>"#;

        let text = extract_text(html);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.contains(&"Executives"));
        assert!(lines.contains(&"Jane Doe, CEO"));
        assert!(lines.contains(&"John Smith, CFO"));
    }

    #[test]
    fn empty_document_yields_empty_string() {
        assert_eq!(extract_text(""), "");
        assert_eq!(extract_text("<html><body></body></html>"), "");
    }

    #[test]
    fn inline_markup_does_not_break_lines() {
        let html = "<html><body><p>The <b>Chief</b> <i>Executive</i> Officer</p></body></html>";
        assert_eq!(extract_text(html), "The Chief Executive Officer");
    }
}
