//! bedrock-chat - Knowledge-base grounded chat over Amazon Bedrock
//!
//! Each question runs through a fixed pipeline: a guardrail classifier
//! filters off-topic and unsafe prompts, a knowledge-base retrieval call
//! fetches supporting passages, and a model call generates an answer
//! grounded in them. Every external failure degrades to a fallback message.
//!
//! # Architecture
//!
//! - **bedrock**: HTTP transport and the service traits it implements
//! - **moderation**: guardrail classifier
//! - **rag**: retrieval, context assembly, generation, turn pipeline
//! - **repl** / **cli**: interactive shell, arguments and configuration

pub mod bedrock;
pub mod cli;
pub mod doctor;
pub mod errors;
pub mod logging;
pub mod models;
pub mod moderation;
pub mod rag;
pub mod repl;
pub mod types;

// Re-export commonly used types
pub use errors::{ChatError, Result};
pub use rag::{ChatPipeline, ChatSettings, TurnOutcome, TurnOutput};
pub use types::{ChatHistory, ChatTurn};
