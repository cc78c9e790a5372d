//! Core domain types for executive intelligence profiles.
//!
//! Serde field names follow the JSON emitted by the extraction templates, so
//! model output deserializes directly into these types (after the defensive
//! JSON slicing done by the core crate).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline invocation (time-sortable).
///
/// The pipeline is stateless; the id exists purely to correlate log events
/// belonging to the same top-level operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Executive
// ---------------------------------------------------------------------------

/// A company executive, discovered and progressively enriched.
///
/// Discovery populates `name`/`title` only; enrichment fills in the
/// biography, priorities, and references. Records are never deleted, only
/// filtered by the `selected` flag upstream of enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Executive {
    /// Full name — the natural key for deduplication.
    #[serde(default)]
    pub name: String,

    /// Job title as stated by the source.
    #[serde(default)]
    pub title: String,

    /// Biography text, empty until enrichment adopts one.
    #[serde(default)]
    pub biography: String,

    /// Company the executive belongs to.
    #[serde(rename = "companyname", default)]
    pub company_name: String,

    /// Business priorities, in extraction order.
    #[serde(default)]
    pub priorities: Vec<String>,

    /// Citation URLs; only validated URLs survive enrichment.
    #[serde(default)]
    pub references: Vec<String>,

    /// Whether the user selected this executive for enrichment.
    #[serde(skip)]
    pub selected: bool,
}

impl Executive {
    /// Create a discovery-stage record with only name and title populated.
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A news article located by search and summarized once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    /// Article URL.
    #[serde(default)]
    pub url: String,

    /// Article title.
    #[serde(default)]
    pub title: String,

    /// One-paragraph summary.
    #[serde(default)]
    pub summary: String,

    /// Free-text key insights; consumed line by line.
    #[serde(default)]
    pub insights: String,
}

impl Article {
    /// Non-empty lines of the insights text.
    pub fn insight_lines(&self) -> Vec<&str> {
        self.insights
            .split(['\n', '\r'])
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// SearchHit
// ---------------------------------------------------------------------------

/// One ranked result from the search backend. Ephemeral — never persisted
/// beyond the orchestrator call that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title as reported by the backend.
    pub title: String,
    /// Parsed result URL.
    pub url: url::Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executive_deserializes_from_extraction_json() {
        let json = r#"{
            "name": "Doug McMillon",
            "title": "President and Chief Executive Officer",
            "biography": "Joined in 1984.",
            "companyname": "Walmart",
            "priorities": ["Omnichannel growth"],
            "references": ["https://corporate.walmart.com/leadership"]
        }"#;

        let exec: Executive = serde_json::from_str(json).expect("parse executive");
        assert_eq!(exec.name, "Doug McMillon");
        assert_eq!(exec.company_name, "Walmart");
        assert_eq!(exec.priorities.len(), 1);
        assert!(!exec.selected);
    }

    #[test]
    fn executive_tolerates_missing_fields() {
        let exec: Executive =
            serde_json::from_str(r#"{"name": "Jane Doe"}"#).expect("parse sparse executive");
        assert_eq!(exec.name, "Jane Doe");
        assert!(exec.title.is_empty());
        assert!(exec.biography.is_empty());
        assert!(exec.priorities.is_empty());
    }

    #[test]
    fn insight_lines_drop_blanks() {
        let article = Article {
            insights: "Revenue up 8%\r\n\n  Margins stable  \n".into(),
            ..Article::default()
        };
        assert_eq!(article.insight_lines(), vec!["Revenue up 8%", "Margins stable"]);
    }

    #[test]
    fn insight_lines_empty_when_no_insights() {
        let article = Article::default();
        assert!(article.insight_lines().is_empty());
    }

    #[test]
    fn run_id_display_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 36);
    }
}
