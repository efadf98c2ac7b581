//! Batched embedding facade over the LLM provider.

use std::sync::Arc;

use crate::core::errors::RagError;
use crate::llm::LlmProvider;

#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn LlmProvider>,
    model: String,
    dimensions: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn LlmProvider>, model: String, dimensions: usize) -> Self {
        Self {
            provider,
            model,
            dimensions,
        }
    }

    /// Embed a batch of texts in one provider call.
    ///
    /// Returns one vector per input, same order and the configured
    /// dimension. The batch fails atomically: any provider failure, a
    /// length mismatch or a wrong-dimension vector surfaces as
    /// `RagError::Embedding` with no partial results.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .provider
            .embed(texts, &self.model)
            .await
            .map_err(RagError::embedding)?;

        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "provider returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(RagError::Embedding(format!(
                "provider returned a {}-dimensional vector, expected {}",
                bad.len(),
                self.dimensions
            )));
        }

        tracing::debug!("Embedded {} texts with {}", texts.len(), self.model);
        Ok(vectors)
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("provider returned no vector".to_string()))
    }
}
