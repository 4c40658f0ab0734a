//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all Ragline data locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Session history records (`data/history/`).
    pub history: PathBuf,
    /// Generator configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            history: root.join("history"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.history)?;
        Ok(paths)
    }
}

/// What to persist when a client disconnects before a streamed answer
/// finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialTurnPolicy {
    /// Persist nothing; the turn never happened.
    Discard,
    /// Persist the question and whatever answer text was produced.
    AppendPartial,
    /// Persist the partial answer with an interruption marker suffix.
    AppendMarker,
}

impl PartialTurnPolicy {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "discard" => Some(PartialTurnPolicy::Discard),
            "append" => Some(PartialTurnPolicy::AppendPartial),
            "marker" => Some(PartialTurnPolicy::AppendMarker),
            _ => None,
        }
    }
}

/// Top-level Ragline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaglineConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// How many passages the retriever is asked for per turn. Fixed
    /// configuration, never taken from the request.
    pub top_k: usize,
    /// Retrieval service endpoint.
    pub retriever_url: String,
    /// Bounded wait for each generator call, in seconds.
    pub llm_timeout_secs: u64,
    /// Bounded wait for each retriever call, in seconds.
    pub retriever_timeout_secs: u64,
    /// Persistence policy for turns interrupted by client disconnect.
    pub partial_turns: PartialTurnPolicy,
}

impl RaglineConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let top_k = std::env::var("RAGLINE_TOP_K")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let retriever_url = std::env::var("RAGLINE_RETRIEVER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:7700/search".to_string());

        let llm_timeout_secs = std::env::var("RAGLINE_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let retriever_timeout_secs = std::env::var("RAGLINE_RETRIEVER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let partial_turns = std::env::var("RAGLINE_PARTIAL_TURNS")
            .ok()
            .and_then(|v| PartialTurnPolicy::parse(&v))
            .unwrap_or(PartialTurnPolicy::Discard);

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            top_k,
            retriever_url,
            llm_timeout_secs,
            retriever_timeout_secs,
            partial_turns,
        })
    }
}
