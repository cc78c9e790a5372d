//! Page-text processing: HTML → plain text → token-bounded chunks.
//!
//! This crate provides:
//! - [`extract_text`] — readable plain text from fetched HTML
//! - [`chunk_text`] / [`chunk_lines`] — pack text into language-model-sized chunks

pub mod chunker;
pub mod extract;

pub use chunker::{chunk_lines, chunk_text, estimate_tokens};
pub use extract::extract_text;
