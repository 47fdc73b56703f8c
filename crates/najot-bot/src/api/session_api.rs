//! Session lifecycle endpoints: create, inspect, credential, new chat

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{internal_error, record, session_not_found, ApiError};
use crate::llm_worker::ApiKey;
use crate::memory::{ArchivedChat, Message};
use crate::shared_state::{with_session, with_session_mut, UnifiedAppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub thread_id: String,
}

/// Full view of one session for rendering the widget
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub thread_id: String,
    pub has_api_key: bool,
    pub messages: Vec<Message>,
    pub archived_chats: usize,
}

#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub has_api_key: bool,
}

#[derive(Debug, Serialize)]
pub struct NewChatResponse {
    pub thread_id: String,
    pub archived_chats: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub chats: Vec<ArchivedChat>,
}

/// POST /sessions
pub async fn create_session(
    State(state): State<UnifiedAppState>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let session = state.sessions.create();
    let result = with_session(&session, |data| CreateSessionResponse {
        session_id: data.session_id.clone(),
        thread_id: data.thread_id.clone(),
    })
    .map(Json)
    .map_err(internal_error);

    if let Ok(Json(ref created)) = result {
        info!("Session {} opened", created.session_id);
    }
    record("/sessions", &result);
    result
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<UnifiedAppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let result = match state.sessions.get(&session_id) {
        Some(session) => with_session(&session, |data| SessionResponse {
            session_id: data.session_id.clone(),
            thread_id: data.thread_id.clone(),
            has_api_key: data.api_key.is_some(),
            messages: data.messages.clone(),
            archived_chats: data.chat_history.len(),
        })
        .map(Json)
        .map_err(internal_error),
        None => Err(session_not_found(&session_id)),
    };
    record("/sessions/:id", &result);
    result
}

/// PUT /sessions/:id/api-key
///
/// A blank key clears the credential, which blocks the chat again.
pub async fn set_api_key(
    State(state): State<UnifiedAppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SetApiKeyRequest>,
) -> Result<Json<SetApiKeyResponse>, ApiError> {
    let result = match state.sessions.get(&session_id) {
        Some(session) => with_session_mut(&session, |data| {
            data.set_api_key(ApiKey::parse(&req.api_key));
            SetApiKeyResponse { has_api_key: data.api_key.is_some() }
        })
        .map(Json)
        .map_err(internal_error),
        None => Err(session_not_found(&session_id)),
    };

    if let Ok(Json(ref updated)) = result {
        info!("Session {} credential updated (present: {})", session_id, updated.has_api_key);
    }
    record("/sessions/:id/api-key", &result);
    result
}

/// POST /sessions/:id/new-chat
pub async fn start_new_chat(
    State(state): State<UnifiedAppState>,
    Path(session_id): Path<String>,
) -> Result<Json<NewChatResponse>, ApiError> {
    let result = match state.sessions.get(&session_id) {
        Some(session) => with_session_mut(&session, |data| {
            data.start_new_chat();
            NewChatResponse {
                thread_id: data.thread_id.clone(),
                archived_chats: data.chat_history.len(),
            }
        })
        .map(Json)
        .map_err(internal_error),
        None => Err(session_not_found(&session_id)),
    };

    if let Ok(Json(ref chat)) = result {
        info!("Session {} started chat {}", session_id, chat.thread_id);
    }
    record("/sessions/:id/new-chat", &result);
    result
}

/// GET /sessions/:id/history
pub async fn get_history(
    State(state): State<UnifiedAppState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let result = match state.sessions.get(&session_id) {
        Some(session) => with_session(&session, |data| HistoryResponse {
            chats: data.chat_history.clone(),
        })
        .map(Json)
        .map_err(internal_error),
        None => Err(session_not_found(&session_id)),
    };
    record("/sessions/:id/history", &result);
    result
}
