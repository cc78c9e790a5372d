//! Error types for ExecIntel.
//!
//! Library crates use [`ExecIntelError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.
//!
//! Most failures in the pipeline are *not* surfaced through this type at the
//! public boundary: the orchestrator converts them into empty/partial results
//! and logs them. The error type exists so the conversion happens explicitly
//! at that boundary instead of being swallowed deep inside a component.

use std::path::PathBuf;

/// Top-level error type for all ExecIntel operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecIntelError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Search backend request or response error.
    #[error("search error: {0}")]
    Search(String),

    /// Network/HTTP error during fetch or reference probing.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Prompt template lookup or rendering error.
    #[error("template error: {0}")]
    Template(String),

    /// Language-model completion backend error.
    #[error("completion error: {0}")]
    Completion(String),

    /// Data validation error (bad URL, invalid argument, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ExecIntelError>;

impl ExecIntelError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_message() {
        let err = ExecIntelError::Search("backend returned HTTP 500".into());
        assert_eq!(err.to_string(), "search error: backend returned HTTP 500");

        let err = ExecIntelError::config("missing api key");
        assert_eq!(err.to_string(), "config error: missing api key");
    }

    #[test]
    fn io_error_keeps_path() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ExecIntelError::io("/tmp/execintel.toml", inner);
        assert!(err.to_string().contains("execintel.toml"));
    }
}
