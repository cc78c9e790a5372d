//! Token-bounded paragraph chunker.
//!
//! Packs consecutive lines of page text into chunks sized for one
//! language-model input each. Chunking is lossy-tolerant in one direction
//! only: on a degenerate budget the chunker returns nothing rather than
//! stalling the pipeline, and the caller logs and moves on.

use tracing::debug;

/// Rough token estimation: words / 0.75 (subword tokenizers average
/// ~1.3 tokens per word).
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    ((words as f32) / 0.75).ceil() as usize
}

/// Pack non-empty lines into chunks of at most `max_tokens` approximate
/// tokens each.
///
/// Lines are consumed in order and never split across chunks: a single line
/// whose estimate already exceeds the budget becomes its own chunk. Blank
/// lines contribute nothing. No chunk in the output is empty. A zero token
/// budget yields an empty result.
pub fn chunk_lines(lines: &[String], max_tokens: usize) -> Vec<String> {
    if max_tokens == 0 {
        debug!("chunker called with zero token budget, returning nothing");
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0usize;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let line_tokens = estimate_tokens(line);
        if current_tokens + line_tokens > max_tokens && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
        current_tokens += line_tokens;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split raw page text on newlines (stripping carriage returns and blank
/// lines) and delegate to [`chunk_lines`].
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    let lines: Vec<String> = text
        .replace('\r', "")
        .split('\n')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    chunk_lines(&lines, max_tokens)
}
