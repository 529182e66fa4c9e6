//! Answer generation from a grounded prompt
use std::sync::Arc;

use crate::bedrock::{InvokeRequest, ModelService};
use crate::errors::ChatError;
use crate::models::ModelId;

/// Output-token cap for answers
pub const ANSWER_MAX_TOKENS: u32 = 500;

/// Result of one generation call
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// Model text, verbatim
    Answer(String),
    /// The model answered with blank text
    Empty,
    /// Transport or service failure
    Failed { reason: String },
}

impl Generation {
    /// Generated text; `""` for both failure variants
    pub fn text(&self) -> &str {
        match self {
            Generation::Answer(text) => text,
            Generation::Empty | Generation::Failed { .. } => "",
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Generation::Answer(_))
    }
}

/// Sends grounded prompts to the model
#[derive(Clone)]
pub struct AnswerGenerator {
    service: Arc<dyn ModelService>,
    max_tokens: u32,
}

impl AnswerGenerator {
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self {
            service,
            max_tokens: ANSWER_MAX_TOKENS,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Generate an answer for `prompt` with the caller's sampling settings
    pub async fn generate(
        &self,
        prompt: &str,
        model: ModelId,
        temperature: f64,
        top_p: f64,
    ) -> Generation {
        let request = InvokeRequest::single_turn(prompt, self.max_tokens, temperature, top_p);

        let text = self
            .service
            .invoke(model, &request)
            .await
            .and_then(|response| response.first_text().map(str::to_string))
            .map_err(|e| ChatError::GenerationService(e.to_string()));

        match text {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!(model = %model, "model returned an empty answer");
                Generation::Empty
            }
            Ok(text) => Generation::Answer(text),
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "error generating response");
                Generation::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
