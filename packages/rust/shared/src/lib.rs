//! Shared types, error model, and configuration for ExecIntel.
//!
//! This crate is the foundation depended on by all other ExecIntel crates.
//! It provides:
//! - [`ExecIntelError`] — the unified error type
//! - Domain types ([`Executive`], [`Article`], [`SearchHit`], [`RunId`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LlmConfig, PipelineConfig, SearchConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_keys,
};
pub use error::{ExecIntelError, Result};
pub use types::{Article, Executive, RunId, SearchHit};
