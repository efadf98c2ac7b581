//! External language-model clients.
//!
//! `LlmProvider` is the seam over the completion/embedding service;
//! `OpenAiProvider` is the production implementation.

pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::LlmProvider;

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::provider::LlmProvider;
    use super::types::ChatRequest;
    use crate::core::errors::ApiError;

    /// In-crate fake provider for pipeline tests.
    ///
    /// Embeddings come from a preset text-to-vector map (falling back to
    /// `default_vector`); chat records the prompt it was given and returns
    /// a canned reply.
    pub struct MockProvider {
        vectors: HashMap<String, Vec<f32>>,
        default_vector: Vec<f32>,
        chat_reply: String,
        fail_embed: bool,
        pub prompts: Mutex<Vec<String>>,
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self {
                vectors: HashMap::new(),
                default_vector: vec![1.0, 0.0, 0.0],
                chat_reply: "mock answer".to_string(),
                fail_embed: false,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.to_string(), vector);
            self
        }

        pub fn with_chat_reply(mut self, reply: &str) -> Self {
            self.chat_reply = reply.to_string();
            self
        }

        pub fn failing_embed(mut self) -> Self {
            self.fail_embed = true;
            self
        }

        pub fn recorded_prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            let prompt = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            Ok(self.chat_reply.clone())
        }

        async fn embed(
            &self,
            inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            if self.fail_embed {
                return Err(ApiError::Internal("embedding backend down".to_string()));
            }
            Ok(inputs
                .iter()
                .map(|text| {
                    self.vectors
                        .get(text)
                        .cloned()
                        .unwrap_or_else(|| self.default_vector.clone())
                })
                .collect())
        }
    }
}
