//! SSE line handling for streamed completions.
//!
//! Kept free of I/O so the wire-format handling is testable on its own.
//! OpenAI-compatible APIs and Anthropic both frame tokens as `data:` lines;
//! the payloads differ.

use serde_json::Value;

/// What one `data:` line means for the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsePayload {
    Token(String),
    Done,
    Error(String),
    /// Comment lines, event framing, empty deltas.
    Ignore,
}

/// Pull complete lines out of the receive buffer, leaving any trailing
/// partial line in place for the next network chunk.
pub fn drain_lines(buffer: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(end) = buffer.find('\n') {
        let line = buffer[..end].trim().to_string();
        buffer.drain(..=end);
        if !line.is_empty() && !line.starts_with(':') {
            lines.push(line);
        }
    }
    lines
}

/// Parse one line of an OpenAI-compatible chat-completions stream.
pub fn parse_openai_line(line: &str) -> SsePayload {
    let Some(data) = line.strip_prefix("data: ") else {
        return SsePayload::Ignore;
    };
    if data.trim() == "[DONE]" {
        return SsePayload::Done;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(parsed) => match parsed["choices"][0]["delta"]["content"].as_str() {
            Some(content) if !content.is_empty() => SsePayload::Token(content.to_string()),
            _ => SsePayload::Ignore,
        },
        Err(_) => SsePayload::Ignore,
    }
}

/// Parse one line of an Anthropic Messages stream.
///
/// Anthropic frames with "event: " lines followed by "data: " lines; only
/// the data payloads carry state we act on.
pub fn parse_anthropic_line(line: &str) -> SsePayload {
    let Some(data) = line.strip_prefix("data: ") else {
        return SsePayload::Ignore;
    };
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return SsePayload::Ignore;
    };
    match parsed["type"].as_str() {
        Some("content_block_delta") => match parsed["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => SsePayload::Token(text.to_string()),
            _ => SsePayload::Ignore,
        },
        Some("message_stop") => SsePayload::Done,
        Some("error") => {
            let msg = parsed["error"]["message"].as_str().unwrap_or("Unknown error");
            SsePayload::Error(msg.to_string())
        }
        _ => SsePayload::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_keeps_partial_tail() {
        let mut buf = "data: one\n\ndata: tw".to_string();
        let lines = drain_lines(&mut buf);
        assert_eq!(lines, vec!["data: one"]);
        assert_eq!(buf, "data: tw");
    }

    #[test]
    fn test_drain_skips_comments() {
        let mut buf = ": keepalive\ndata: x\n".to_string();
        assert_eq!(drain_lines(&mut buf), vec!["data: x"]);
    }

    #[test]
    fn test_openai_token() {
        let line = r#"data: {"choices":[{"delta":{"content":"你好"}}]}"#;
        assert_eq!(parse_openai_line(line), SsePayload::Token("你好".into()));
    }

    #[test]
    fn test_openai_done_marker() {
        assert_eq!(parse_openai_line("data: [DONE]"), SsePayload::Done);
    }

    #[test]
    fn test_openai_empty_delta_ignored() {
        let line = r#"data: {"choices":[{"delta":{}}]}"#;
        assert_eq!(parse_openai_line(line), SsePayload::Ignore);
    }

    #[test]
    fn test_anthropic_delta_and_stop() {
        let delta = r#"data: {"type":"content_block_delta","delta":{"text":"hi"}}"#;
        assert_eq!(parse_anthropic_line(delta), SsePayload::Token("hi".into()));

        let stop = r#"data: {"type":"message_stop"}"#;
        assert_eq!(parse_anthropic_line(stop), SsePayload::Done);
    }

    #[test]
    fn test_anthropic_error_payload() {
        let line = r#"data: {"type":"error","error":{"message":"overloaded"}}"#;
        assert_eq!(
            parse_anthropic_line(line),
            SsePayload::Error("overloaded".into())
        );
    }

    #[test]
    fn test_event_framing_ignored() {
        assert_eq!(
            parse_anthropic_line("event: content_block_delta"),
            SsePayload::Ignore
        );
    }
}
