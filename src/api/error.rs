use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::generation::GenerationError;

/// Errors surfaced by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Memory not found")]
    NotFound,

    /// The record changed underneath a long-running request.
    #[error("{0}")]
    Conflict(String),

    #[error("generation failed: {0}")]
    Upstream(String),

    #[error("storage failed: {0}")]
    Storage(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Memory not found".to_string(), None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Upstream(err) => {
                tracing::error!(error = %err, "generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate memory".to_string(),
                    Some(err),
                )
            }
            ApiError::Storage(err) => {
                tracing::error!(error = %err, "storage failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(err),
                )
            }
        };

        (status, Json(ErrorBody { message, error })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("Validation error: {}", rejection.body_text()))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Storage(format!("{err:#}"))
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}
