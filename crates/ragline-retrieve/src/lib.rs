//! Retrieval boundary: an opaque retriever capability plus deterministic
//! context assembly.
//!
//! The retriever itself (embeddings, vector index) lives elsewhere; this
//! crate only defines the seam and a remote HTTP client for it.

pub mod context;
pub mod remote;
pub mod types;

pub use context::assemble_context;
pub use remote::RemoteRetriever;
pub use types::{Retriever, ScoredPassage};
