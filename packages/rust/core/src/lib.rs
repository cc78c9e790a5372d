//! Executive intelligence extraction pipeline.
//!
//! This crate provides:
//! - [`templates`] — the immutable prompt template registry
//! - [`backend`] — the opaque completion backend boundary
//! - [`extract`] — template invocation and defensive JSON parsing
//! - [`merge`] — partial-result merging and name deduplication
//! - [`validate`] — concurrent reference link validation
//! - [`pipeline`] — the orchestrator exposing the four public operations

pub mod backend;
pub mod extract;
pub mod merge;
pub mod pipeline;
pub mod templates;
pub mod validate;

pub use backend::{CompletionBackend, HttpCompletion};
pub use extract::{Invoker, parse_article, parse_executive, parse_executives};
pub use merge::{merge_bio_and_priorities, merge_executives};
pub use pipeline::{
    ArticleOutcome, ArticleSource, DiscoveryOutcome, EnrichOutcome, FilingKind, FinancialOutcome,
    Orchestrator,
};
pub use templates::TemplateRegistry;
pub use validate::Validator;
