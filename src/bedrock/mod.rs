//! Amazon Bedrock transport
//!
//! HTTP client, SigV4 signing and request/response types for model
//! invocation and knowledge-base retrieval.

pub mod client;
pub mod service;
pub mod signing;
pub mod types;

// Re-export commonly used types
pub use client::{BedrockClient, EndpointStatus};
pub use service::{KnowledgeBaseService, ModelService};
pub use signing::SigV4Signer;
pub use types::{InvokeRequest, InvokeResponse, RetrieveRequest, RetrieveResponse};
