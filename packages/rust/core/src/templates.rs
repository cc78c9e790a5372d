//! Prompt template registry.
//!
//! Templates are compiled once at startup into an immutable registry and
//! passed by reference to the orchestrator. The registry is deliberately
//! closed: the pipeline invokes templates by the names below, and a lookup
//! miss is a programming error surfaced as [`ExecIntelError::Template`].

use std::collections::HashMap;

use minijinja::Environment;

use execintel_shared::{ExecIntelError, Result};

/// Per-chunk executive discovery.
pub const EXECUTIVE_LIST: &str = "executive_list";
/// Per-chunk biography extraction for one executive.
pub const EXECUTIVE_BIO: &str = "executive_bio";
/// Per-chunk business-priorities extraction for one executive.
pub const EXECUTIVE_PRIORITIES: &str = "executive_priorities";
/// Per-article news summarization.
pub const ARTICLE_SUMMARY: &str = "article_summary";
/// Per-chunk and roll-up 10-K summarization.
pub const FILING_10K_SUMMARY: &str = "filing_10k_summary";
/// Per-chunk and roll-up quarterly-earnings summarization.
pub const FILING_QUARTERLY_SUMMARY: &str = "filing_quarterly_summary";

/// The built-in template set. Sources live in the binary; the template
/// store boundary is the registry itself, not a directory on disk.
const BUILTIN: &[(&str, &str)] = &[
    (
        EXECUTIVE_LIST,
        "You are reading a page about a company's leadership.\n\
         Extract every executive mentioned in the text below.\n\
         Respond with a JSON array of objects, each with \"name\" and \"title\" fields,\n\
         and nothing else.\n\
         \n\
         Text:\n\
         {{ chunk }}",
    ),
    (
        EXECUTIVE_BIO,
        "Write a short factual biography of {{ exec_name }}, an executive at\n\
         {{ company_name }}, using only the source text below.\n\
         Respond with a JSON object with \"name\", \"biography\", and \"references\"\n\
         (an array of source URLs) fields, and nothing else.\n\
         \n\
         Source text:\n\
         {{ person_info }}",
    ),
    (
        EXECUTIVE_PRIORITIES,
        "List the current business priorities of {{ exec_name }}, an executive at\n\
         {{ company_name }}, using only the source text below.\n\
         Respond with a JSON object with \"name\", \"priorities\" (an array of short\n\
         statements), and \"references\" (an array of source URLs) fields, and\n\
         nothing else.\n\
         \n\
         Source text:\n\
         {{ person_info }}",
    ),
    (
        ARTICLE_SUMMARY,
        "Summarize the news article at {{ url }}.\n\
         Respond with a JSON object with \"title\", \"summary\", and \"insights\"\n\
         (key insights, one per line) fields, and nothing else.",
    ),
    (
        FILING_10K_SUMMARY,
        "Summarize the following excerpt of a 10-K filing for an executive\n\
         briefing. Keep concrete figures, risks, and guidance. Respond with\n\
         plain text.\n\
         \n\
         {{ input }}",
    ),
    (
        FILING_QUARTERLY_SUMMARY,
        "Summarize the following excerpt of a quarterly earnings report for an\n\
         executive briefing. Keep concrete figures, risks, and guidance. Respond\n\
         with plain text.\n\
         \n\
         {{ input }}",
    ),
];

// ---------------------------------------------------------------------------
// TemplateRegistry
// ---------------------------------------------------------------------------

/// Immutable mapping from template name to compiled template.
#[derive(Debug)]
pub struct TemplateRegistry {
    env: Environment<'static>,
}

impl TemplateRegistry {
    /// Compile the built-in template set.
    pub fn builtin() -> Result<Self> {
        let mut env = Environment::new();
        for &(name, source) in BUILTIN {
            env.add_template(name, source).map_err(|e| {
                ExecIntelError::Template(format!("failed to compile template {name}: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Render a template with the given named arguments.
    pub fn render(&self, name: &str, args: &HashMap<String, String>) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| ExecIntelError::Template(format!("unknown template {name}: {e}")))?;

        template
            .render(args)
            .map_err(|e| ExecIntelError::Template(format!("failed to render {name}: {e}")))
    }

    /// Whether a template with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_all_templates() {
        let registry = TemplateRegistry::builtin().expect("compile builtins");
        for name in [
            EXECUTIVE_LIST,
            EXECUTIVE_BIO,
            EXECUTIVE_PRIORITIES,
            ARTICLE_SUMMARY,
            FILING_10K_SUMMARY,
            FILING_QUARTERLY_SUMMARY,
        ] {
            assert!(registry.contains(name), "missing template: {name}");
        }
    }

    #[test]
    fn render_substitutes_arguments() {
        let registry = TemplateRegistry::builtin().unwrap();
        let args = HashMap::from([
            ("exec_name".to_string(), "Jane Doe".to_string()),
            ("company_name".to_string(), "Acme Corp".to_string()),
            ("person_info".to_string(), "Jane Doe joined Acme in 2001.".to_string()),
        ]);

        let prompt = registry.render(EXECUTIVE_BIO, &args).expect("render");
        assert!(prompt.contains("Jane Doe"));
        assert!(prompt.contains("Acme Corp"));
        assert!(prompt.contains("joined Acme in 2001"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let registry = TemplateRegistry::builtin().unwrap();
        let result = registry.render("no_such_template", &HashMap::new());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no_such_template"));
    }
}
