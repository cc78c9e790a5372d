//! Merging and deduplication of partial extraction results.
//!
//! Discovery produces per-chunk partial executive lists that are flattened
//! and deduplicated by name; enrichment produces biography and priorities
//! partials that are folded into the base record. Dedup keeps the FIRST
//! record seen per name and discards later duplicates whole — later fields
//! are never merged in, even when richer.

use std::collections::HashSet;

use execintel_shared::Executive;

/// Maximum priorities/references appended per contributing source chunk.
pub const MAX_ITEMS_PER_SOURCE: usize = 5;

/// Flatten per-chunk partial lists and deduplicate by executive name.
///
/// Name matching is case-insensitive; records with blank names are dropped.
/// First occurrence in submission order wins. Idempotent on deduplicated
/// input.
pub fn merge_executives(partials: Vec<Vec<Executive>>) -> Vec<Executive> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for exec in partials.into_iter().flatten() {
        let name = exec.name.trim();
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_lowercase()) {
            merged.push(exec);
        }
    }

    merged
}

/// Biography partial produced by the biography sub-extraction.
#[derive(Debug, Clone, Default)]
pub struct BioPartial {
    pub biography: String,
    pub references: Vec<String>,
}

/// Priorities partial produced by the priorities sub-extraction.
#[derive(Debug, Clone, Default)]
pub struct PrioritiesPartial {
    pub priorities: Vec<String>,
    pub references: Vec<String>,
}

/// Fold the two independently computed partials into the base executive.
///
/// The biography is first-non-empty-wins: an existing biography is never
/// overwritten. Priorities and references are appended without dedup —
/// reference dedup happens in the validation step.
pub fn merge_bio_and_priorities(
    mut exec: Executive,
    bio: BioPartial,
    priorities: PrioritiesPartial,
) -> Executive {
    if exec.biography.is_empty() && !bio.biography.trim().is_empty() {
        exec.biography = bio.biography;
    }
    exec.references.extend(bio.references);
    exec.priorities.extend(priorities.priorities);
    exec.references.extend(priorities.references);
    exec
}

/// Append at most [`MAX_ITEMS_PER_SOURCE`] items from one source chunk.
pub fn append_bounded(dst: &mut Vec<String>, src: Vec<String>) {
    dst.extend(src.into_iter().take(MAX_ITEMS_PER_SOURCE));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(name: &str, title: &str) -> Executive {
        Executive::new(name, title)
    }

    #[test]
    fn first_occurrence_wins() {
        let merged = merge_executives(vec![
            vec![exec("Jane Doe", "CEO"), exec("John Smith", "CFO")],
            vec![exec("Jane Doe", "Chief Executive Officer and President")],
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "Jane Doe");
        // The later, richer title is discarded whole.
        assert_eq!(merged[0].title, "CEO");
    }

    #[test]
    fn dedup_is_case_insensitive() {
        let merged = merge_executives(vec![
            vec![exec("Jane Doe", "CEO")],
            vec![exec("JANE DOE", "CEO")],
            vec![exec("jane doe", "CEO")],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Jane Doe");
    }

    #[test]
    fn blank_names_never_survive() {
        let merged = merge_executives(vec![vec![exec("", "CEO"), exec("  ", "CFO"), exec("Jane", "COO")]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Jane");
    }

    #[test]
    fn idempotent_on_deduplicated_input() {
        let once = merge_executives(vec![vec![exec("A", "1"), exec("B", "2"), exec("a", "3")]]);
        let twice = merge_executives(vec![once.clone()]);
        assert_eq!(once.len(), twice.len());
        for (x, y) in once.iter().zip(twice.iter()) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.title, y.title);
        }
    }

    #[test]
    fn deterministic_given_submission_order() {
        let a = merge_executives(vec![vec![exec("X", "1")], vec![exec("Y", "2")]]);
        let b = merge_executives(vec![vec![exec("Y", "2")], vec![exec("X", "1")]]);
        assert_eq!(a[0].name, "X");
        assert_eq!(b[0].name, "Y");
    }

    #[test]
    fn existing_biography_is_never_overwritten() {
        let mut base = exec("Jane", "CEO");
        base.biography = "Original biography.".into();

        let merged = merge_bio_and_priorities(
            base,
            BioPartial {
                biography: "A different, newer biography.".into(),
                references: vec!["https://a.example/".into()],
            },
            PrioritiesPartial::default(),
        );

        assert_eq!(merged.biography, "Original biography.");
        // References still accumulate.
        assert_eq!(merged.references.len(), 1);
    }

    #[test]
    fn empty_biography_adopts_candidate() {
        let merged = merge_bio_and_priorities(
            exec("Jane", "CEO"),
            BioPartial {
                biography: "Joined in 2001.".into(),
                references: vec![],
            },
            PrioritiesPartial::default(),
        );
        assert_eq!(merged.biography, "Joined in 2001.");
    }

    #[test]
    fn whitespace_candidate_does_not_adopt() {
        let merged = merge_bio_and_priorities(
            exec("Jane", "CEO"),
            BioPartial {
                biography: "   ".into(),
                references: vec![],
            },
            PrioritiesPartial::default(),
        );
        assert!(merged.biography.is_empty());
    }

    #[test]
    fn priorities_and_references_append_without_dedup() {
        let merged = merge_bio_and_priorities(
            exec("Jane", "CEO"),
            BioPartial {
                biography: "Bio.".into(),
                references: vec!["https://dup.example/".into()],
            },
            PrioritiesPartial {
                priorities: vec!["Growth".into(), "Costs".into()],
                references: vec!["https://dup.example/".into()],
            },
        );

        assert_eq!(merged.priorities, vec!["Growth", "Costs"]);
        // Duplicate survives until validation dedupes it.
        assert_eq!(merged.references.len(), 2);
    }

    #[test]
    fn append_bounded_caps_per_source() {
        let mut dst = Vec::new();
        let src: Vec<String> = (0..9).map(|i| format!("item {i}")).collect();
        append_bounded(&mut dst, src);
        assert_eq!(dst.len(), MAX_ITEMS_PER_SOURCE);
        assert_eq!(dst[0], "item 0");
    }
}
