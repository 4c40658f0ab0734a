//! API shape tests — validates the JSON surfaces the HTTP clients depend
//! on: request bodies, persisted turn records, and response envelopes.

use serde_json::json;

/// The turn request body: both fields required, nothing else.
#[test]
fn test_chat_request_shape() {
    let req = json!({
        "question": "什么是球状闪电",
        "session_id": "s1",
    });

    assert!(req["question"].is_string());
    assert!(req["session_id"].is_string());
}

/// A request missing session_id must not deserialize into a valid body;
/// the transport rejects it before the pipeline runs.
#[test]
fn test_chat_request_requires_both_fields() {
    #[derive(serde::Deserialize)]
    #[allow(dead_code)]
    struct ChatTurnRequest {
        question: String,
        session_id: String,
    }

    let missing_session = r#"{"question": "什么是球状闪电"}"#;
    assert!(serde_json::from_str::<ChatTurnRequest>(missing_session).is_err());

    let missing_question = r#"{"session_id": "s1"}"#;
    assert!(serde_json::from_str::<ChatTurnRequest>(missing_question).is_err());

    let complete = r#"{"question": "q", "session_id": "s1"}"#;
    assert!(serde_json::from_str::<ChatTurnRequest>(complete).is_ok());
}

/// Persisted turn record: role+content pairs in order, lowercase roles.
#[test]
fn test_turn_record_shape() {
    let record = json!([
        {"role": "human", "content": "什么是球状闪电", "created_at": 1754500000000i64},
        {"role": "assistant", "content": "球状闪电是一种罕见的大气现象。", "created_at": 1754500001000i64},
    ]);

    let turns = record.as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["role"], "human");
    assert_eq!(turns[1]["role"], "assistant");
    assert!(turns[0]["content"].is_string());
    assert!(turns[0]["created_at"].is_number());
}

/// GET /api/history/{session_id} response envelope.
#[test]
fn test_history_response_shape() {
    let response = json!({
        "sessionId": "s1",
        "turns": [
            {"role": "human", "content": "q", "created_at": 0},
            {"role": "assistant", "content": "a", "created_at": 0},
        ],
        "total": 2,
    });

    assert!(response["sessionId"].is_string());
    assert!(response["turns"].is_array());
    assert!(response["total"].is_number());
}

/// DELETE /api/history/{session_id} response.
#[test]
fn test_clear_response_shape() {
    let response = json!({ "cleared": true, "sessionId": "s1" });
    assert!(response["cleared"].is_boolean());
    assert!(response["sessionId"].is_string());
}

/// POST /api/chat/complete response.
#[test]
fn test_complete_response_shape() {
    let response = json!({
        "answer": "球状闪电是一种罕见的大气现象。",
        "sessionId": "s1",
    });
    assert!(response["answer"].is_string());
    assert!(response["sessionId"].is_string());
}

/// GET /api/chat/status response.
#[test]
fn test_status_response_shape() {
    let status = json!({
        "llmAvailable": true,
        "llmProvider": "anthropic",
        "model": "claude-3-5-haiku-20241022",
        "retrieverUrl": "http://127.0.0.1:7700/search",
        "topK": 2,
    });

    assert!(status["llmAvailable"].is_boolean());
    assert!(status["llmProvider"].is_string());
    assert!(status["retrieverUrl"].is_string());
    assert!(status["topK"].is_number());
}

/// GET /api/chat/config response — configured flags only, never keys.
#[test]
fn test_config_response_shape() {
    let config = json!({
        "preferredProvider": "auto",
        "openaiConfigured": false,
        "anthropicConfigured": true,
        "openaiBaseUrl": "https://api.openai.com/v1/chat/completions",
        "openaiModel": "gpt-4o-mini",
        "anthropicModel": "claude-3-5-haiku-20241022",
        "temperature": 0.7,
        "maxTokens": 2048,
        "activeProvider": "anthropic",
    });

    assert!(config["preferredProvider"].is_string());
    assert!(config["openaiConfigured"].is_boolean());
    assert!(config["anthropicConfigured"].is_boolean());
    assert!(config["temperature"].is_number());
    assert!(config["maxTokens"].is_number());
    assert!(config.get("openaiApiKey").is_none());
    assert!(config.get("anthropicApiKey").is_none());
}

/// Error envelope used by every non-streaming failure path.
#[test]
fn test_error_response_shape() {
    let response = json!({ "error": "No LLM provider configured" });
    assert!(response["error"].is_string());
}
