//! Ragline Core — conversation types, configuration, error taxonomy.

pub mod config;
pub mod error;
pub mod turn;

pub use config::{DataPaths, PartialTurnPolicy, RaglineConfig};
pub use error::{Error, Result};
pub use turn::{Turn, TurnRole};
