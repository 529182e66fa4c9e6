//! End-to-end chat turn pipeline
//!
//! validate -> retrieve -> assemble -> generate -> format, driven by a
//! [`TurnMachine`]. Every external failure has already been folded into a
//! result variant by the component that saw it, so a turn always produces an
//! assistant message.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::bedrock::{BedrockClient, KnowledgeBaseService, ModelService};
use crate::errors::{ChatError, Result};
use crate::models::ModelId;
use crate::moderation::{PromptClassifier, Verdict};
use crate::rag::context::{AssembledContext, ContextBuilder};
use crate::rag::generator::{AnswerGenerator, Generation};
use crate::rag::retrieval::{RetrievalEngine, RetrievalRecord, DEFAULT_TOP_K};
use crate::rag::state::{TurnEvent, TurnMachine, TurnState};
use crate::types::{ChatHistory, ChatTurn};

/// Shown when the guardrail refuses a question or cannot be reached
pub const REFUSAL_MESSAGE: &str = "I'm unable to answer this, please try again";

/// Shown instead of a blank answer when generation fails
pub const GENERATION_FALLBACK: &str =
    "I wasn't able to generate an answer right now, please try again.";

/// Temperature granularity exposed to the user
pub const TEMPERATURE_STEP: f64 = 0.1;

/// Top-p granularity exposed to the user
pub const TOP_P_STEP: f64 = 0.001;

/// Message used when retrieval produced nothing to ground on
pub fn no_passages_message(knowledge_base_id: &str) -> String {
    format!(
        "I could not find relevant passages in Knowledge Base `{}`. Please verify the ID or ingest data first.",
        knowledge_base_id
    )
}

/// Per-session settings applied to every turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub model: ModelId,
    pub knowledge_base_id: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: usize,
    /// Return the retrieved records alongside the answer
    pub show_context: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            knowledge_base_id: String::new(),
            temperature: 1.0,
            top_p: 1.0,
            top_k: DEFAULT_TOP_K,
            show_context: false,
        }
    }
}

impl ChatSettings {
    pub fn validate(&self) -> Result<()> {
        check_unit_range("temperature", self.temperature)?;
        check_unit_range("top_p", self.top_p)?;
        if self.top_k == 0 {
            return Err(ChatError::ConfigError("top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Set temperature, snapped to [`TEMPERATURE_STEP`]
    pub fn set_temperature(&mut self, value: f64) -> Result<()> {
        check_unit_range("temperature", value)?;
        self.temperature = snap(value, TEMPERATURE_STEP);
        Ok(())
    }

    /// Set top-p, snapped to [`TOP_P_STEP`]
    pub fn set_top_p(&mut self, value: f64) -> Result<()> {
        check_unit_range("top_p", value)?;
        self.top_p = snap(value, TOP_P_STEP);
        Ok(())
    }
}

fn check_unit_range(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ChatError::ConfigError(format!(
            "{} must be between 0.0 and 1.0, got {}",
            name, value
        )));
    }
    Ok(())
}

fn snap(value: f64, step: f64) -> f64 {
    let steps = (value / step).round();
    // Re-derive through the step count so 0.30000000000000004 prints as 0.3
    let decimals = (-step.log10()).ceil() as i32;
    let scale = 10f64.powi(decimals);
    (steps * step * scale).round() / scale
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// Generated answer delivered
    Answered,
    /// Guardrail refused the question
    Refused,
    /// Nothing was retrieved to ground an answer on
    NoPassages,
    /// Generation failed and the fallback text was delivered
    GenerationFailed,
}

/// Everything a caller needs to render one turn
#[derive(Debug, Clone)]
pub struct TurnOutput {
    /// The assistant message, already appended to the history
    pub response: String,
    pub outcome: TurnOutcome,
    pub verdict: Verdict,
    /// Retrieved records, in service order, when context visibility is on
    pub context: Option<Vec<RetrievalRecord>>,
    /// States the turn passed through
    pub trace: Vec<TurnState>,
}

/// Chat turn pipeline over injected Bedrock services
#[derive(Clone)]
pub struct ChatPipeline {
    classifier: PromptClassifier,
    retriever: RetrievalEngine,
    generator: AnswerGenerator,
    context_builder: ContextBuilder,
    answer_without_context: bool,
}

impl ChatPipeline {
    /// Create a pipeline from the two service seams
    pub fn new(
        model: Arc<dyn ModelService>,
        knowledge_base: Arc<dyn KnowledgeBaseService>,
    ) -> Self {
        Self {
            classifier: PromptClassifier::new(model.clone()),
            retriever: RetrievalEngine::new(knowledge_base),
            generator: AnswerGenerator::new(model),
            context_builder: ContextBuilder::new(),
            answer_without_context: false,
        }
    }

    /// Create a pipeline where one client serves both seams
    pub fn from_client(client: Arc<BedrockClient>) -> Self {
        Self::new(client.clone(), client)
    }

    /// Keep generating when no passage has any text
    pub fn with_answer_without_context(mut self, enabled: bool) -> Self {
        self.answer_without_context = enabled;
        self
    }

    pub fn with_context_builder(mut self, context_builder: ContextBuilder) -> Self {
        self.context_builder = context_builder;
        self
    }

    pub fn answer_without_context(&self) -> bool {
        self.answer_without_context
    }

    /// Process one utterance and append both turns to `history`
    ///
    /// Blank input is rejected before anything is called or recorded.
    pub async fn run_turn(
        &self,
        history: &mut ChatHistory,
        utterance: &str,
        settings: &ChatSettings,
    ) -> Result<TurnOutput> {
        if utterance.trim().is_empty() {
            return Err(ChatError::EmptyUtterance);
        }

        let mut machine = TurnMachine::new();
        machine.advance(TurnEvent::Submitted)?;

        let verdict = self.classifier.classify(utterance, settings.model).await;
        if !verdict.is_allowed() {
            machine.advance(TurnEvent::Refused)?;
            tracing::info!(verdict = ?verdict, "turn refused");
            return Ok(self.finish(
                history,
                utterance,
                REFUSAL_MESSAGE.to_string(),
                TurnOutcome::Refused,
                verdict,
                None,
                machine,
            ));
        }
        machine.advance(TurnEvent::Approved)?;

        let retrieval = self
            .retriever
            .retrieve(utterance, &settings.knowledge_base_id, settings.top_k)
            .await;
        machine.advance(TurnEvent::Retrieved)?;
        let records = retrieval.into_records();

        let context = self.context_builder.build(&records);
        let (response, outcome) = if self.should_generate(&context) {
            machine.advance(TurnEvent::ContextReady)?;
            let generation = self.generate(&context, utterance, settings).await;
            machine.advance(TurnEvent::Generated)?;
            format_generated(&context, generation)
        } else {
            machine.advance(TurnEvent::NoContext)?;
            tracing::info!(
                knowledge_base_id = %settings.knowledge_base_id,
                "no passages to ground on"
            );
            (no_passages_message(&settings.knowledge_base_id), TurnOutcome::NoPassages)
        };
        machine.advance(TurnEvent::Formatted)?;

        let shown = settings.show_context.then_some(records);
        Ok(self.finish(history, utterance, response, outcome, verdict, shown, machine))
    }

    /// A sourced record counts even when its text is empty
    fn should_generate(&self, context: &AssembledContext) -> bool {
        !context.is_empty() || context.has_references() || self.answer_without_context
    }

    async fn generate(
        &self,
        context: &AssembledContext,
        utterance: &str,
        settings: &ChatSettings,
    ) -> Generation {
        let prompt = self.context_builder.grounded_prompt(context, utterance);
        tracing::debug!(
            passages = context.passage_count,
            references = context.references.len(),
            "generating answer"
        );
        self.generator
            .generate(&prompt, settings.model, settings.temperature, settings.top_p)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        history: &mut ChatHistory,
        utterance: &str,
        response: String,
        outcome: TurnOutcome,
        verdict: Verdict,
        context: Option<Vec<RetrievalRecord>>,
        machine: TurnMachine,
    ) -> TurnOutput {
        history.push(ChatTurn::user(utterance));
        history.push(ChatTurn::assistant(response.clone()));
        tracing::info!(outcome = ?outcome, "turn complete");

        TurnOutput {
            response,
            outcome,
            verdict,
            context,
            trace: machine.into_trace(),
        }
    }
}

/// Substitute the fallback for failed generations, then attach references
fn format_generated(context: &AssembledContext, generation: Generation) -> (String, TurnOutcome) {
    let (answer, outcome) = match generation {
        Generation::Answer(text) => (text, TurnOutcome::Answered),
        Generation::Empty | Generation::Failed { .. } => {
            (GENERATION_FALLBACK.to_string(), TurnOutcome::GenerationFailed)
        }
    };

    if context.has_references() {
        (context.append_references(&answer), outcome)
    } else {
        (answer, outcome)
    }
}
