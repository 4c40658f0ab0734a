//! Chat routes — the streaming RAG turn endpoint plus generator config.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio_stream::StreamExt;

use crate::state::AppState;
use ragline_core::Error;
use ragline_llm::GeneratorConfigUpdate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(stream_chat))
        .route("/chat/complete", post(chat))
        .route("/chat/status", get(get_status))
        .route("/chat/config", get(get_config).put(update_config))
}

/// One conversational turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurnRequest {
    pub question: String,
    pub session_id: String,
}

// ---------------------------------------------------------------
// Streaming chat
// ---------------------------------------------------------------

/// Streamed turn: chunked `text/plain` body, first fragment forwarded as
/// soon as the generator produces it. A mid-stream fault terminates the
/// body abruptly — the client's signal that the answer is incomplete.
async fn stream_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatTurnRequest>,
) -> Response {
    if let Err(resp) = validate(&req) {
        return resp;
    }
    let Some(chain) = state.chain() else {
        return no_provider_response();
    };

    match chain.run_stream(&req.session_id, &req.question).await {
        Ok(stream) => {
            let body = Body::from_stream(stream.map(|item| item.map(Bytes::from)));
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(body)
                .unwrap()
        }
        Err(e) => fault_response(e),
    }
}

// ---------------------------------------------------------------
// Non-streaming chat
// ---------------------------------------------------------------

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatTurnRequest>,
) -> Response {
    if let Err(resp) = validate(&req) {
        return resp;
    }
    let Some(chain) = state.chain() else {
        return no_provider_response();
    };

    match chain.run(&req.session_id, &req.question).await {
        Ok(answer) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "answer": answer,
                "sessionId": req.session_id,
            })),
        )
            .into_response(),
        Err(e) => fault_response(e),
    }
}

// ---------------------------------------------------------------
// Status
// ---------------------------------------------------------------

async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.llm_config.read();
    let resolved = config.resolve();

    Json(serde_json::json!({
        "llmAvailable": resolved.is_some(),
        "llmProvider": resolved.as_ref().map(|r| r.provider.to_string()),
        "model": resolved.as_ref().map(|r| r.model.clone()),
        "retrieverUrl": state.config.retriever_url,
        "topK": state.config.top_k,
    }))
}

// ---------------------------------------------------------------
// Config
// ---------------------------------------------------------------

async fn get_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.llm_config.read();
    Json(serde_json::to_value(config.to_response()).unwrap())
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<GeneratorConfigUpdate>,
) -> impl IntoResponse {
    let mut config = state.llm_config.write();
    config.apply_update(&update);

    if let Err(e) = config.save() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("Failed to save config: {}", e) })),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::to_value(config.to_response()).unwrap()),
    )
}

// ---------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------

/// Reject blank fields before any pipeline work. Missing fields never get
/// this far — deserialization already refused them.
fn validate(req: &ChatTurnRequest) -> Result<(), Response> {
    if req.question.trim().is_empty() || req.session_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "question and session_id must be non-empty",
            })),
        )
            .into_response());
    }
    Ok(())
}

fn no_provider_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": "No LLM provider configured" })),
    )
        .into_response()
}

fn fault_response(err: Error) -> Response {
    let status = match err {
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::Retrieval(_) | Error::Generation(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}
