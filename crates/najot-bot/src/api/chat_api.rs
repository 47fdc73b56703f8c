//! POST /sessions/:id/messages: one chat turn

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{api_error, internal_error, record, session_not_found, ApiError};
use crate::chat::{self, ChatOutcome, MISSING_API_KEY_WARNING};
use crate::memory::Message;
use crate::shared_state::UnifiedAppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub reply: String,
    pub thread_id: String,
    pub messages: Vec<Message>,
}

pub async fn send_message(
    State(state): State<UnifiedAppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    info!("Chat request for session: {}", session_id);

    let result = match state.sessions.get(&session_id) {
        None => Err(session_not_found(&session_id)),
        Some(session) => match chat::send_message(&state, &session, &req.content).await {
            Ok(ChatOutcome::Replied { reply, thread_id, messages }) => {
                Ok(Json(SendMessageResponse { reply, thread_id, messages }))
            }
            Ok(ChatOutcome::MissingApiKey) => {
                Err(api_error(StatusCode::UNAUTHORIZED, MISSING_API_KEY_WARNING))
            }
            Ok(ChatOutcome::EmptyMessage) => {
                Err(api_error(StatusCode::BAD_REQUEST, "Message cannot be empty"))
            }
            Err(e) => Err(internal_error(e)),
        },
    };

    record("/sessions/:id/messages", &result);
    result
}
