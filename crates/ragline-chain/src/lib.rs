//! Conversation orchestration — the rephrase → retrieve → generate chain
//! with per-session persistence.

pub mod chain;
pub mod prompt;
pub mod rephrase;

pub use chain::{AnswerStream, ChainOptions, ConversationChain, INTERRUPTED_MARKER};
pub use rephrase::rephrase;
