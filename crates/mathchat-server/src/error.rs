//! Application error type and Axum response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mathchat_core::AgentError;
use serde::Serialize;

/// Transport-level error. Everything the agent surfaces becomes a 500;
/// there is no finer-grained status contract.
#[derive(Debug)]
pub enum AppError {
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        tracing::error!("Agent error: {}", err);
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
