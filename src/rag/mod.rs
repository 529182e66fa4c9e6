//! Retrieval-augmented answering
//!
//! Components:
//! - Retrieval Engine: knowledge-base queries and hit normalization
//! - Context Builder: grounded prompt and references block
//! - Answer Generator: model call over the grounded prompt
//! - Pipeline: per-turn orchestration driven by the turn state machine

pub mod content;
pub mod context;
pub mod generator;
pub mod pipeline;
pub mod retrieval;
pub mod state;

// Re-export key types
pub use content::RetrievedContent;
pub use context::{AssembledContext, ContextBuilder, Reference};
pub use generator::{AnswerGenerator, Generation};
pub use pipeline::{ChatPipeline, ChatSettings, TurnOutcome, TurnOutput};
pub use retrieval::{RetrievalEngine, RetrievalOutcome, RetrievalRecord};
pub use state::{TurnEvent, TurnMachine, TurnState};
