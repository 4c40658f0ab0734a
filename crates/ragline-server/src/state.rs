//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;

use ragline_chain::{ChainOptions, ConversationChain};
use ragline_core::RaglineConfig;
use ragline_history::SessionStore;
use ragline_llm::{GeneratorConfig, RemoteGenerator};
use ragline_retrieve::{RemoteRetriever, Retriever};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: RaglineConfig,
    pub store: Arc<SessionStore>,
    pub retriever: Arc<dyn Retriever>,
    pub llm_config: RwLock<GeneratorConfig>,
    pub http: Client,
}

impl AppState {
    pub fn new(config: RaglineConfig, store: SessionStore) -> Self {
        let http = Client::new();

        // Load generator config
        let llm_config = GeneratorConfig::load(&config.data_paths.llm_config_file);

        // Initialize the remote retriever client
        let retriever: Arc<dyn Retriever> = Arc::new(RemoteRetriever::new(
            http.clone(),
            config.retriever_url.clone(),
            Duration::from_secs(config.retriever_timeout_secs),
        ));

        Self {
            config,
            store: Arc::new(store),
            retriever,
            llm_config: RwLock::new(llm_config),
            http,
        }
    }

    /// Assemble a conversation chain from the currently-resolved generator.
    /// Returns None when no provider is configured.
    pub fn chain(&self) -> Option<ConversationChain> {
        let resolved = self.llm_config.read().resolve()?;
        let generator = Arc::new(RemoteGenerator::new(self.http.clone(), resolved));

        let opts = ChainOptions {
            top_k: self.config.top_k,
            llm_timeout: Duration::from_secs(self.config.llm_timeout_secs),
            retriever_timeout: Duration::from_secs(self.config.retriever_timeout_secs),
            partial_turns: self.config.partial_turns,
        };

        Some(ConversationChain::new(
            self.store.clone(),
            self.retriever.clone(),
            generator,
            opts,
        ))
    }
}
