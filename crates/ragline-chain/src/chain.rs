//! Conversation orchestrator — drives exactly one turn end-to-end and owns
//! the persistence/ordering contract.
//!
//! A turn only reaches the durable log once a real answer exists: rephrase,
//! retrieval, and generation faults abort with nothing persisted. A failed
//! append after a delivered answer is logged loudly but does not retract
//! the answer.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use ragline_core::{Error, PartialTurnPolicy, Result, Turn};
use ragline_history::SessionStore;
use ragline_llm::{Generator, PromptMessage, StreamChunk};
use ragline_retrieve::{assemble_context, Retriever};

use crate::prompt;
use crate::rephrase::rephrase;

/// Suffix appended to a partial answer under
/// `PartialTurnPolicy::AppendMarker`.
pub const INTERRUPTED_MARKER: &str = " [interrupted]";

/// Streamed answer: lazy, finite, single-pass sequence of text fragments.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Tuning for one chain instance.
#[derive(Debug, Clone)]
pub struct ChainOptions {
    /// Passages requested per turn. Fixed configuration, never
    /// user-supplied.
    pub top_k: usize,
    /// Bounded wait for each generator call (and each streamed chunk).
    pub llm_timeout: Duration,
    /// Bounded wait for the retriever call.
    pub retriever_timeout: Duration,
    /// What to persist when the client disconnects mid-stream.
    pub partial_turns: PartialTurnPolicy,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            top_k: 2,
            llm_timeout: Duration::from_secs(120),
            retriever_timeout: Duration::from_secs(30),
            partial_turns: PartialTurnPolicy::Discard,
        }
    }
}

/// Composes history, rephrasing, retrieval, and generation into a single
/// request/response cycle per user turn.
pub struct ConversationChain {
    store: Arc<SessionStore>,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    opts: ChainOptions,
}

impl ConversationChain {
    pub fn new(
        store: Arc<SessionStore>,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        opts: ChainOptions,
    ) -> Self {
        Self {
            store,
            retriever,
            generator,
            opts,
        }
    }

    /// Steps 1–3 of a turn: load history, derive the standalone question,
    /// retrieve and assemble context. Returns the full answer prompt.
    async fn prepare(&self, session_id: &str, question: &str) -> Result<Vec<PromptMessage>> {
        let history = self.store.load(session_id).await;

        let standalone = rephrase(
            self.generator.as_ref(),
            &history,
            question,
            self.opts.llm_timeout,
        )
        .await?;
        debug!("Standalone question for session {}: {}", session_id, standalone);

        let passages = match tokio::time::timeout(
            self.opts.retriever_timeout,
            self.retriever.query(&standalone, self.opts.top_k),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(Error::Timeout("retriever")),
        };
        let context = assemble_context(&passages);

        Ok(prompt::build_answer_messages(&context, &history, &standalone))
    }

    /// Run one turn and return the full answer.
    pub async fn run(&self, session_id: &str, question: &str) -> Result<String> {
        let messages = self.prepare(session_id, question).await?;

        let answer = match tokio::time::timeout(
            self.opts.llm_timeout,
            self.generator.complete(messages),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(Error::Timeout("generator")),
        };

        let turns = vec![Turn::human(question), Turn::assistant(answer.clone())];
        if let Err(e) = self.store.append(session_id, turns).await {
            // The caller already has the answer; a later load will not
            // reflect this turn.
            warn!(
                "Turn for session {} was answered but not durably recorded: {}",
                session_id, e
            );
        }

        Ok(answer)
    }

    /// Run one turn, forwarding generator output as it is produced.
    ///
    /// History load, rephrasing, and retrieval complete before the stream
    /// is returned, so their faults surface as plain errors. The turn is
    /// appended after the stream is exhausted; a mid-stream generator
    /// fault yields a terminal `Err` and persists nothing. Dropping the
    /// stream before completion (client disconnect) goes through the
    /// configured `PartialTurnPolicy`.
    pub async fn run_stream(&self, session_id: &str, question: &str) -> Result<AnswerStream> {
        let messages = self.prepare(session_id, question).await?;

        let store = self.store.clone();
        let per_chunk = self.opts.llm_timeout;
        let mut llm = self.generator.stream(messages);
        let mut guard = PartialGuard {
            store: store.clone(),
            session_id: session_id.to_string(),
            question: question.to_string(),
            produced: String::new(),
            policy: self.opts.partial_turns,
            settled: false,
        };
        let session_id = session_id.to_string();
        let question = question.to_string();

        let stream = async_stream::stream! {
            loop {
                let next = match tokio::time::timeout(per_chunk, llm.next()).await {
                    Ok(n) => n,
                    Err(_) => {
                        guard.settle();
                        yield Err(Error::Timeout("generator"));
                        return;
                    }
                };
                match next {
                    Some(StreamChunk::Token(text)) => {
                        guard.produced.push_str(&text);
                        yield Ok(text);
                    }
                    Some(StreamChunk::Done { .. }) | None => {
                        guard.settle();
                        let turns = vec![
                            Turn::human(question.clone()),
                            Turn::assistant(guard.produced.clone()),
                        ];
                        if let Err(e) = store.append(&session_id, turns).await {
                            warn!(
                                "Turn for session {} was answered but not durably recorded: {}",
                                session_id, e
                            );
                        }
                        return;
                    }
                    Some(StreamChunk::Error(e)) => {
                        // Faults never go through the partial-turn policy.
                        guard.settle();
                        yield Err(Error::Generation(e));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Applies the partial-turn policy when a streamed turn is dropped before
/// completion. Normal completion and faults settle the guard first, so the
/// policy only ever sees cancellations.
struct PartialGuard {
    store: Arc<SessionStore>,
    session_id: String,
    question: String,
    produced: String,
    policy: PartialTurnPolicy,
    settled: bool,
}

impl PartialGuard {
    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for PartialGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let content = match self.policy {
            PartialTurnPolicy::Discard => return,
            PartialTurnPolicy::AppendPartial => {
                if self.produced.is_empty() {
                    return;
                }
                self.produced.clone()
            }
            PartialTurnPolicy::AppendMarker => {
                if self.produced.is_empty() {
                    return;
                }
                format!("{}{}", self.produced, INTERRUPTED_MARKER)
            }
        };

        let store = self.store.clone();
        let session_id = std::mem::take(&mut self.session_id);
        let question = std::mem::take(&mut self.question);
        let turns = vec![Turn::human(question), Turn::assistant(content)];

        // Either the full pair lands through the serialized append path or
        // nothing does; the log never sees a half-written record.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.append(&session_id, turns).await {
                        warn!(
                            "Partial turn for session {} was not recorded: {}",
                            session_id, e
                        );
                    }
                });
            }
            Err(_) => warn!(
                "Dropped partial turn for session {}: no runtime to persist it",
                session_id
            ),
        }
    }
}
