//! Context assembly: deduplicate hydrated documents and join their text.

use crate::types::HydratedDocument;
use std::collections::HashSet;

/// Separator placed between study blocks.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Keep the first document for each `study_id`, preserving order.
pub fn dedup_by_study(documents: &[HydratedDocument]) -> Vec<HydratedDocument> {
    let mut seen = HashSet::new();
    documents
        .iter()
        .filter(|doc| seen.insert(doc.study_id.as_str()))
        .cloned()
        .collect()
}

/// Builds the single text block the model answers from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler {
    max_chars: Option<usize>,
}

impl ContextAssembler {
    /// `max_chars` of `None` means no budget.
    pub fn new(max_chars: Option<usize>) -> Self {
        Self { max_chars }
    }

    /// Deduplicate `documents` and join their contents.
    ///
    /// With a budget, whole documents are dropped from the tail once the
    /// next one would push the text past it.
    pub fn assemble(&self, documents: &[HydratedDocument]) -> String {
        let unique = dedup_by_study(documents);

        let mut kept: Vec<&str> = Vec::with_capacity(unique.len());
        let mut used = 0usize;
        for doc in &unique {
            let cost = doc.content.chars().count()
                + if kept.is_empty() { 0 } else { DOCUMENT_SEPARATOR.len() };

            if let Some(budget) = self.max_chars {
                if used + cost > budget {
                    tracing::warn!(
                        budget,
                        kept = kept.len(),
                        dropped = unique.len() - kept.len(),
                        "Context budget reached; dropping remaining documents"
                    );
                    break;
                }
            }

            used += cost;
            kept.push(&doc.content);
        }

        tracing::debug!(
            retrieved = documents.len(),
            unique = unique.len(),
            included = kept.len(),
            chars = used,
            "Assembled context"
        );

        kept.join(DOCUMENT_SEPARATOR)
    }
}
