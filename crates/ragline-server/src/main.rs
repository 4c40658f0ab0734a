//! Ragline — conversational RAG server with durable per-session history.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("RAGLINE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    // Initialize configuration
    let config = ragline_core::RaglineConfig::from_env(&data_dir)?;
    let port = config.port;

    // Initialize session store
    let store = ragline_history::SessionStore::open(&config.data_paths.history)
        .map_err(|e| anyhow::anyhow!("Failed to open session store: {}", e))?;

    // Build application state
    let state = Arc::new(AppState::new(config, store));

    if state.llm_config.read().resolve().is_none() {
        info!("No generator configured; set an API key env var or PUT /api/chat/config");
    }

    // Build router
    let app = routes::build_router(state.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Ragline server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
