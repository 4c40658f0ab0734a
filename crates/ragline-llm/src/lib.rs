//! Generator boundary: external LLM streaming over SSE.
//!
//! The model itself is an opaque, hosted capability; this crate defines the
//! `Generator` seam, a remote client for OpenAI-compatible and Anthropic
//! APIs, and the persisted generator configuration.

pub mod config;
pub mod generator;
pub mod sse;
pub mod types;

pub use config::{GeneratorConfig, GeneratorConfigUpdate, ResolvedGenerator};
pub use generator::{Generator, RemoteGenerator};
pub use types::*;
