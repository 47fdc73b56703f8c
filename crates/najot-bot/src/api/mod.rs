//! HTTP surface of the chat widget

pub mod chat_api;
pub mod session_api;
pub mod widget;

use axum::{http::StatusCode, Json};
use serde::Serialize;

pub use chat_api::send_message;
pub use session_api::{create_session, get_session, set_api_key, start_new_chat, get_history};
pub use widget::index;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

pub fn session_not_found(session_id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("Session not found: {}", session_id))
}

pub fn internal_error(e: anyhow::Error) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
}

/// Count the request under `route` with the status it resolved to.
pub fn record<T>(route: &str, result: &Result<T, ApiError>) {
    let status = match result {
        Ok(_) => StatusCode::OK,
        Err((status, _)) => *status,
    };
    crate::metrics::inc_request(route, status.as_str());
}
