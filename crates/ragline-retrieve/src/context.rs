//! Context assembly from retrieved passages.

use crate::types::ScoredPassage;

/// Concatenate passage texts into one context block, in the retriever's
/// rank order, separated by a newline boundary. Zero passages yield the
/// empty string — the generator's template handles that case.
pub fn assemble_context(passages: &[ScoredPassage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
