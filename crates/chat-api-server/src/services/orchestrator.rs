use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::Stream;
use tracing::{error, info};

use crate::models::chat::{ChatMessage, Role};
use crate::utils::context::RequestContext;

use super::memory::ConversationMemory;

/// Trait for the model client. Fragments arrive as they are produced;
/// the sequence is finite and not restartable, and any item may fail.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>>;
}

/// One unit of orchestrator output. Failures travel as an explicit
/// variant rather than an error type so the transport always receives a
/// terminal signal instead of a dropped connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Done,
    Error(String),
}

/// Composes memory and the model client into one response stream per
/// request: load bounded history, persist the user turn, relay model
/// fragments, and commit the assembled assistant turn only when the
/// fragment sequence ends normally.
pub struct ChatOrchestrator {
    memory: Arc<ConversationMemory>,
    llm: Arc<dyn LlmProvider>,
}

impl ChatOrchestrator {
    pub fn new(memory: Arc<ConversationMemory>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { memory, llm }
    }

    /// Build the response stream for one chat request.
    ///
    /// The returned generator suspends at each I/O point; dropping it
    /// (consumer disconnect) cancels the in-flight model iteration and
    /// discards the partial assistant text without committing it. The
    /// user turn stays durable even when generation later fails.
    pub fn stream_chat(
        &self,
        ctx: RequestContext,
        session_id: String,
        message: String,
    ) -> Pin<Box<dyn Stream<Item = StreamEvent> + Send>> {
        let memory = self.memory.clone();
        let llm = self.llm.clone();

        Box::pin(async_stream::stream! {
            let history = match memory.fetch_bounded(&session_id, None, None).await {
                Ok(history) => history,
                Err(e) => {
                    error!(
                        request_id = %ctx.request_id,
                        "Failed to load history for session {}: {}", session_id, e
                    );
                    yield StreamEvent::Error(format!("An error occurred: {}", e));
                    return;
                }
            };

            info!(
                request_id = %ctx.request_id,
                "Loaded {} messages from history for session {}",
                history.len(),
                session_id
            );

            if let Err(e) = memory.append(&session_id, Role::User, &message).await {
                error!(
                    request_id = %ctx.request_id,
                    "Failed to persist user message for session {}: {}", session_id, e
                );
                yield StreamEvent::Error(format!("An error occurred: {}", e));
                return;
            }

            // Compose in memory instead of re-reading the store: saves a
            // round trip and sidesteps the append's own visibility.
            let mut outgoing = history;
            outgoing.push(ChatMessage::user(&message));

            let mut fragments = match llm.generate_stream(&outgoing).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    error!(
                        request_id = %ctx.request_id,
                        "Failed to start generation for session {}: {}", session_id, e
                    );
                    yield StreamEvent::Error(format!("An error occurred: {}", e));
                    return;
                }
            };

            use futures::StreamExt;

            let mut assembled = String::new();

            while let Some(fragment) = fragments.next().await {
                match fragment {
                    Ok(delta) => {
                        if !delta.is_empty() {
                            assembled.push_str(&delta);
                            yield StreamEvent::Delta(delta);
                        }
                    }
                    Err(e) => {
                        error!(
                            request_id = %ctx.request_id,
                            "Generation failed mid-stream for session {}: {}", session_id, e
                        );
                        yield StreamEvent::Error(format!("An error occurred: {}", e));
                        return;
                    }
                }
            }

            if let Err(e) = memory.append(&session_id, Role::Assistant, &assembled).await {
                error!(
                    request_id = %ctx.request_id,
                    "Failed to persist assistant message for session {}: {}", session_id, e
                );
                yield StreamEvent::Error(format!("An error occurred: {}", e));
                return;
            }

            info!(
                request_id = %ctx.request_id,
                "Completed streaming response for session {} ({} chars)",
                session_id,
                assembled.len()
            );

            yield StreamEvent::Done;
        })
    }
}
