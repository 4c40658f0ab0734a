//! Query rephrasing — follow-up question plus history to a standalone
//! question.
//!
//! Retrieval quality degrades sharply on pronoun-laden follow-ups, so the
//! retriever is always handed a self-contained query string. This module
//! only builds the prompt and parses the reply; fault handling beyond the
//! bounded wait belongs to the orchestrator. No retries, no caching.

use std::time::Duration;

use ragline_core::{Error, Result, Turn};
use ragline_llm::Generator;

use crate::prompt;

/// Rewrite a follow-up question so it stands on its own.
///
/// An empty history cannot change the question's meaning, so that case
/// skips the model call entirely.
pub async fn rephrase(
    generator: &dyn Generator,
    history: &[Turn],
    question: &str,
    timeout: Duration,
) -> Result<String> {
    if history.is_empty() {
        return Ok(question.to_string());
    }

    let messages = prompt::build_rephrase_messages(history, question);
    let reply = match tokio::time::timeout(timeout, generator.complete(messages)).await {
        Ok(result) => result?,
        Err(_) => return Err(Error::Timeout("rephrase")),
    };

    let standalone = reply.trim();
    if standalone.is_empty() {
        // A blank rewrite would starve retrieval; fall back to the raw question.
        return Ok(question.to_string());
    }
    Ok(standalone.to_string())
}
