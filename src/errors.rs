//! Error types for bedrock-chat
//!
//! Every external call in the chat pipeline surfaces its failure through
//! `ChatError`; the pipeline then degrades each failure into a fallback
//! outcome instead of propagating it to the user.

use thiserror::Error;

/// Main error type for the chat pipeline and its Bedrock clients
#[derive(Error, Debug)]
pub enum ChatError {
    /// Guardrail classification call failed
    #[error("Moderation service error: {0}")]
    ModerationService(String),

    /// Knowledge-base retrieval call failed
    #[error("Retrieval service error: {0}")]
    RetrievalService(String),

    /// Answer generation call failed
    #[error("Generation service error: {0}")]
    GenerationService(String),

    /// Bedrock answered with a non-success status
    #[error("Bedrock returned HTTP {status}: {body}")]
    ServiceError { status: u16, body: String },

    /// SigV4 signing or credential resolution failed
    #[error("Request signing failed: {0}")]
    Signing(String),

    /// Response body did not have the expected shape
    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    /// Turn state machine errors
    #[error("Invalid turn transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    /// Blank input never enters the pipeline
    #[error("Utterance is empty")]
    EmptyUtterance,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Chat error: {0}")]
    Generic(String),
}

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Convert anyhow errors to ChatError
impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        ChatError::Generic(err.to_string())
    }
}
