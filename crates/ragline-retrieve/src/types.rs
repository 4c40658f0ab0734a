//! Retriever trait and passage types.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use ragline_core::Result;

/// A retrieved span of reference text with relevance score and source
/// metadata. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub text: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Trait for retriever backends.
pub trait Retriever: Send + Sync {
    /// Top-`k` most relevant passages for a query, best first. May return
    /// fewer than `k`; zero matches is a normal outcome, not an error.
    fn query<'a>(&'a self, text: &'a str, k: usize) -> BoxFuture<'a, Result<Vec<ScoredPassage>>>;
}
