//! Answer composition.
//!
//! Builds a grounded prompt from retrieved sources, or a fallback prompt
//! when nothing passed the threshold, and makes one completion call.

use std::sync::Arc;

use serde::Serialize;

use super::retrieve::Source;
use crate::core::errors::RagError;
use crate::llm::types::{ChatMessage, ChatRequest};
use crate::llm::LlmProvider;

/// Visible separator between context chunks in the prompt.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Opening flag the model is instructed to use for grounded answers.
pub const GROUNDED_FLAG: &str = "Based on the reference documents";
/// Opening flag for answers produced without any retrieved context.
pub const UNGROUNDED_FLAG: &str = "No reference documents found";

#[derive(Debug, Clone, Serialize)]
pub struct ComposedAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

#[derive(Clone)]
pub struct AnswerComposer {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl AnswerComposer {
    pub fn new(provider: Arc<dyn LlmProvider>, model: String) -> Self {
        Self { provider, model }
    }

    /// Compose an answer for `query` from `sources`.
    ///
    /// One completion request, no streaming, no retries; transient
    /// failures propagate as `RagError::Completion`.
    pub async fn compose(
        &self,
        query: &str,
        sources: Vec<Source>,
    ) -> Result<ComposedAnswer, RagError> {
        let prompt = if sources.is_empty() {
            fallback_prompt(query)
        } else {
            grounded_prompt(query, &sources)
        };

        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);
        let answer = self
            .provider
            .chat(request, &self.model)
            .await
            .map_err(RagError::completion)?;

        Ok(ComposedAnswer { answer, sources })
    }
}

fn fallback_prompt(query: &str) -> String {
    format!(
        "Answer the following question:\n\n\"{query}\"\n\n\
         Note: no reference documents related to this question were found. \
         Answer from general knowledge only, and begin your answer with \
         \"{UNGROUNDED_FLAG}.\""
    )
}

fn grounded_prompt(query: &str, sources: &[Source]) -> String {
    let context = sources
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!(
        "The following are excerpts from my documents:\n\n{context}\n\n\
         Note: the excerpts above come from reference documents relevant to the \
         question. Answer the question using them.\n\
         Question: \"{query}\"\n\n\
         Begin your answer with \"{GROUNDED_FLAG},\" and keep it concise."
    )
}
