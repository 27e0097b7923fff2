use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use futures::StreamExt;
use tracing::info;
use validator::Validate;

use crate::models::chat::{validate_session_id, ChatRequest};
use crate::services::{ChatOrchestrator, ConversationMemory, StreamEvent};
use crate::utils::context::RequestContext;
use crate::utils::error::ApiError;

/// POST /api/chat — stream the model response over SSE.
///
/// Deltas go out as `data: <text>`, normal completion as `data: [DONE]`,
/// and a failed stream ends with a single `data: {"error": ...}` payload
/// instead of the terminator.
pub async fn chat_stream_handler(
    Extension(orchestrator): Extension<Arc<ChatOrchestrator>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let ctx = RequestContext::new();

    info!(
        request_id = %ctx.request_id,
        "Chat request - session: {}, message_length: {}",
        request.session_id,
        request.message.len()
    );

    let events = orchestrator.stream_chat(ctx, request.session_id, request.message);

    let stream = events.map(|event| {
        Ok(match event {
            StreamEvent::Delta(text) => Event::default().data(text),
            StreamEvent::Done => Event::default().data("[DONE]"),
            StreamEvent::Error(message) => Event::default()
                .data(serde_json::json!({ "error": message }).to_string()),
        })
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// DELETE /api/chat/{session_id} — drop the stored history immediately.
pub async fn clear_history_handler(
    Extension(memory): Extension<Arc<ConversationMemory>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    validate_session_id(&session_id)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    memory
        .clear(&session_id)
        .await
        .map_err(|e| ApiError::StoreUnavailable(e.to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}
