use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadBody {
    pub filename: String,
    /// Already-extracted plain text of the document.
    pub content: String,
}

/// POST /api/upload — register a document and ingest its text.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UploadBody>,
) -> Result<impl IntoResponse, ApiError> {
    let file_type = detect_file_type(&body.filename).ok_or_else(|| {
        ApiError::BadRequest(
            "Unsupported file type. Only Markdown and plain-text files are allowed.".to_string(),
        )
    })?;

    if body.content.len() > state.settings.max_upload_bytes {
        return Err(ApiError::BadRequest(format!(
            "File too large. Maximum size is {} bytes.",
            state.settings.max_upload_bytes
        )));
    }

    if body.content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "No text content found in file".to_string(),
        ));
    }

    let document = state
        .documents
        .insert(&body.filename, file_type, body.content.len() as i64)
        .await?;

    match state.ingest.ingest(document.id, &body.content).await {
        Ok(records) => {
            state
                .documents
                .set_chunk_count(document.id, records.len() as i64)
                .await?;

            let document = state
                .documents
                .get(document.id)
                .await?
                .ok_or_else(|| ApiError::Internal("document vanished after ingest".to_string()))?;

            Ok(Json(json!({ "success": true, "document": document })))
        }
        Err(err) => {
            // compensating cleanup: ingest has no rollback, so remove what landed
            tracing::error!(
                "Ingestion of document {} failed: {}; cleaning up",
                document.id,
                err
            );
            if let Err(cleanup_err) = cleanup_failed_ingest(&state, document.id).await {
                tracing::warn!(
                    "Cleanup after failed ingest of document {} incomplete: {}",
                    document.id,
                    cleanup_err
                );
            }
            Err(err.into())
        }
    }
}

async fn cleanup_failed_ingest(state: &AppState, document_id: i64) -> Result<(), ApiError> {
    let keys = state.chunks.keys_for_document(document_id).await?;
    if !keys.is_empty() {
        state.index.delete_by_ids(&keys).await?;
        state.chunks.delete_document(document_id).await?;
    }
    state.documents.delete(document_id).await?;
    Ok(())
}

fn detect_file_type(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit('.').next()?.to_lowercase();
    match ext.as_str() {
        "md" | "markdown" => Some("md"),
        "txt" => Some("txt"),
        _ => None,
    }
}
