use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Client for an external text-generation/embedding service.
///
/// Both calls are single request/response; the core performs no retries
/// and no streaming.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError>;

    /// generate embeddings, one vector per input, same order
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
