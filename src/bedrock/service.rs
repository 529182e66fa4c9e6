//! Service seams between the chat pipeline and Bedrock
//!
//! The classifier, retriever and generator only see these traits, so the
//! pipeline runs unchanged against `BedrockClient` or an in-memory double.

use async_trait::async_trait;

use crate::bedrock::types::{InvokeRequest, InvokeResponse, RetrieveRequest, RetrieveResponse};
use crate::errors::Result;
use crate::models::ModelId;

/// Text generation (bedrock-runtime `InvokeModel`)
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn invoke(&self, model: ModelId, request: &InvokeRequest) -> Result<InvokeResponse>;
}

/// Knowledge-base search (bedrock-agent-runtime `Retrieve`)
#[async_trait]
pub trait KnowledgeBaseService: Send + Sync {
    async fn retrieve(
        &self,
        knowledge_base_id: &str,
        request: &RetrieveRequest,
    ) -> Result<RetrieveResponse>;
}
