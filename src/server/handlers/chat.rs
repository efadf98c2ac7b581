use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub query: String,
    /// Similarity threshold in percent; defaults from settings.
    pub threshold: Option<f32>,
}

/// POST /api/chat — retrieve context for the query and compose an answer.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatBody>,
) -> Result<impl IntoResponse, ApiError> {
    let threshold = body.threshold.unwrap_or(state.settings.default_threshold);

    let sources = state
        .retrieve
        .retrieve(&body.query, state.settings.top_k, threshold)
        .await?;

    tracing::info!(
        "Query matched {} sources at threshold {:.0}%",
        sources.len(),
        threshold
    );

    let composed = state.composer.compose(&body.query, sources).await?;
    Ok(Json(composed))
}
