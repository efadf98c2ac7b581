use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Errors produced by the retrieval core.
///
/// Validation variants are detected before any external call and never
/// retried. Dependency variants carry the stringified cause of the failed
/// external call and propagate untouched; retry policy, if any, belongs to
/// the caller.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("document produced no chunks")]
    EmptyDocument,
    #[error("threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(f32),
    #[error("embedding request failed: {0}")]
    Embedding(String),
    #[error("vector index request failed: {0}")]
    VectorIndex(String),
    #[error("chunk store request failed: {0}")]
    ChunkStore(String),
    #[error("completion request failed: {0}")]
    Completion(String),
}

impl RagError {
    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        RagError::Embedding(err.to_string())
    }

    pub fn vector_index<E: std::fmt::Display>(err: E) -> Self {
        RagError::VectorIndex(err.to_string())
    }

    pub fn chunk_store<E: std::fmt::Display>(err: E) -> Self {
        RagError::ChunkStore(err.to_string())
    }

    pub fn completion<E: std::fmt::Display>(err: E) -> Self {
        RagError::Completion(err.to_string())
    }

    fn is_validation(&self) -> bool {
        matches!(
            self,
            RagError::EmptyQuery | RagError::EmptyDocument | RagError::InvalidThreshold(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        if err.is_validation() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
