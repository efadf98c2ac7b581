use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// GET /api/documents — list documents with aggregate stats.
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.documents.list().await?;
    let stats = state.documents.stats().await?;

    Ok(Json(json!({
        "total_documents": stats.total_documents,
        "total_chunks": stats.total_chunks,
        "total_size": stats.total_size,
        "documents": documents,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub id: Option<i64>,
    pub all: Option<bool>,
}

/// DELETE /api/documents?id=N or ?all=true.
///
/// Cascade order: vectors first, then chunk rows, then the metadata row —
/// listing always starts from the metadata row, so vectors must never
/// outlive it.
pub async fn delete_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeleteParams>,
) -> Result<impl IntoResponse, ApiError> {
    if params.all == Some(true) {
        let keys = state.chunks.all_keys().await?;
        if !keys.is_empty() {
            tracing::info!("Deleting {} vectors", keys.len());
            state.index.delete_by_ids(&keys).await?;
        }
        state.chunks.delete_all().await?;
        let deleted = state.documents.delete_all().await?;

        tracing::info!("Deleted all {} documents", deleted);
        return Ok(Json(json!({ "success": true, "deleted_count": deleted })));
    }

    if let Some(id) = params.id {
        if state.documents.get(id).await?.is_none() {
            return Err(ApiError::NotFound(format!("document {} not found", id)));
        }

        let keys = state.chunks.keys_for_document(id).await?;
        if !keys.is_empty() {
            tracing::info!("Deleting {} vectors for document {}", keys.len(), id);
            state.index.delete_by_ids(&keys).await?;
        }
        state.chunks.delete_document(id).await?;
        state.documents.delete(id).await?;

        tracing::info!("Deleted document {}", id);
        return Ok(Json(json!({ "success": true, "deleted_count": 1 })));
    }

    Err(ApiError::BadRequest(
        "Missing required parameter: id or all".to_string(),
    ))
}
