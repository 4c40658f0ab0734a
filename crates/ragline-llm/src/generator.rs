//! Generator trait and the remote streaming implementation.

use futures::future::BoxFuture;
use futures::Stream;
use reqwest::Client;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::config::ResolvedGenerator;
use crate::sse::{self, SsePayload};
use crate::types::{BoxedStream, PromptMessage, ProviderKind, StreamChunk};
use ragline_core::{Error, Result};

/// Trait for generator backends.
pub trait Generator: Send + Sync {
    /// Stream the answer as text chunks. Finite, single-pass, not
    /// restartable.
    fn stream(&self, messages: Vec<PromptMessage>) -> BoxedStream;

    /// Run a completion and return the full answer text. Default: collect
    /// the token stream.
    fn complete(&self, messages: Vec<PromptMessage>) -> BoxFuture<'static, Result<String>> {
        let mut stream = self.stream(messages);
        Box::pin(async move {
            let mut out = String::new();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    StreamChunk::Token(text) => out.push_str(&text),
                    StreamChunk::Done { .. } => return Ok(out),
                    StreamChunk::Error(e) => return Err(Error::Generation(e)),
                }
            }
            Ok(out)
        })
    }
}

/// Generator backed by a hosted chat-completion API.
pub struct RemoteGenerator {
    client: Client,
    provider: ProviderKind,
    url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: usize,
}

impl RemoteGenerator {
    pub fn new(client: Client, resolved: ResolvedGenerator) -> Self {
        Self {
            client,
            provider: resolved.provider,
            url: resolved.url,
            model: resolved.model,
            api_key: resolved.api_key,
            temperature: resolved.temperature,
            max_tokens: resolved.max_tokens,
        }
    }
}

impl Generator for RemoteGenerator {
    fn stream(&self, messages: Vec<PromptMessage>) -> BoxedStream {
        match self.provider {
            ProviderKind::OpenAi => Box::pin(stream_openai_compat(
                self.client.clone(),
                self.url.clone(),
                messages,
                self.model.clone(),
                self.api_key.clone(),
                self.temperature,
                self.max_tokens,
            )),
            ProviderKind::Anthropic => Box::pin(stream_anthropic(
                self.client.clone(),
                self.url.clone(),
                messages,
                self.model.clone(),
                self.api_key.clone(),
                self.temperature,
                self.max_tokens,
            )),
        }
    }
}

/// Stream from an OpenAI-compatible chat-completions endpoint.
fn stream_openai_compat(
    client: Client,
    url: String,
    messages: Vec<PromptMessage>,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: usize,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    let msgs: Vec<serde_json::Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    async_stream::stream! {
        let body = json!({
            "model": model,
            "messages": msgs,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "stream": true,
        });

        debug!("Streaming from {} with model {}", url, model);

        let response = match client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(format!("Request failed: {}", e));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(format!("API error {}: {}", status, body));
            return;
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut token_count = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(format!("Stream read error: {}", e));
                    return;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&bytes));

            for line in sse::drain_lines(&mut buffer) {
                match sse::parse_openai_line(&line) {
                    SsePayload::Token(text) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    SsePayload::Done => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    SsePayload::Error(e) => {
                        yield StreamChunk::Error(e);
                        return;
                    }
                    SsePayload::Ignore => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}

/// Stream from Anthropic's Messages API.
fn stream_anthropic(
    client: Client,
    url: String,
    messages: Vec<PromptMessage>,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: usize,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    // The Messages API takes the system prompt out of band.
    let system_msg: Option<String> = messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.clone());

    let conv_msgs: Vec<serde_json::Value> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    async_stream::stream! {
        let mut body = json!({
            "model": model,
            "messages": conv_msgs,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "stream": true,
        });

        if let Some(sys) = system_msg {
            body["system"] = json!(sys);
        }

        debug!("Streaming from Anthropic with model {}", model);

        let response = match client
            .post(&url)
            .header("x-api-key", &api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(format!("Request failed: {}", e));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(format!("API error {}: {}", status, body));
            return;
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut token_count = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(format!("Stream read error: {}", e));
                    return;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&bytes));

            for line in sse::drain_lines(&mut buffer) {
                match sse::parse_anthropic_line(&line) {
                    SsePayload::Token(text) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    SsePayload::Done => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    SsePayload::Error(e) => {
                        yield StreamChunk::Error(e);
                        return;
                    }
                    SsePayload::Ignore => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A generator whose stream is a fixed chunk script.
    struct Scripted(Vec<StreamChunk>);

    impl Generator for Scripted {
        fn stream(&self, _messages: Vec<PromptMessage>) -> BoxedStream {
            Box::pin(tokio_stream::iter(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_complete_collects_tokens() {
        let gen = Scripted(vec![
            StreamChunk::Token("Ball ".into()),
            StreamChunk::Token("lightning".into()),
            StreamChunk::Done { tokens_used: 2 },
        ]);
        let answer = gen.complete(vec![PromptMessage::human("q")]).await.unwrap();
        assert_eq!(answer, "Ball lightning");
    }

    #[tokio::test]
    async fn test_complete_surfaces_stream_error() {
        let gen = Scripted(vec![
            StreamChunk::Token("partial".into()),
            StreamChunk::Error("upstream died".into()),
        ]);
        let err = gen.complete(vec![PromptMessage::human("q")]).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }
}
