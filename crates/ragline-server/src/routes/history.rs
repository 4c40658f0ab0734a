//! Session history routes — inspect and clear per-session records.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/history/{session_id}",
        get(get_history).delete(clear_history),
    )
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    let turns = state.store.load(&session_id).await;
    let total = turns.len();
    Json(serde_json::json!({
        "sessionId": session_id,
        "turns": turns,
        "total": total,
    }))
}

async fn clear_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.store.clear(&session_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "cleared": true, "sessionId": session_id })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}
