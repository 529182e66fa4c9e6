//! Wire types for the two Bedrock endpoints the chat uses
//!
//! - `InvokeModel` on bedrock-runtime (Anthropic messages body)
//! - `Retrieve` on bedrock-agent-runtime (knowledge-base vector search)

use serde::{Deserialize, Serialize};

use crate::errors::{ChatError, Result};

/// Messages API version Bedrock expects for Anthropic models
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One typed content block inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Chat message in the Anthropic messages format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Single-block user message
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// `InvokeModel` request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokeRequest {
    pub anthropic_version: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl InvokeRequest {
    /// Single-turn request carrying one user text block
    pub fn single_turn(
        text: impl Into<String>,
        max_tokens: u32,
        temperature: f64,
        top_p: f64,
    ) -> Self {
        Self {
            anthropic_version: ANTHROPIC_VERSION.to_string(),
            messages: vec![Message::user_text(text)],
            max_tokens,
            temperature,
            top_p,
        }
    }

    /// Text of the first user block, if any
    pub fn prompt_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .flat_map(|m| m.content.iter())
            .map(|ContentBlock::Text { text }| text.as_str())
            .next()
    }
}

/// Content block in a model response
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBlock {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Token accounting reported by the model
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// `InvokeModel` response body
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeResponse {
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl InvokeResponse {
    /// Response with a single text block
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ResponseBlock {
                kind: Some("text".to_string()),
                text: Some(text.into()),
            }],
            stop_reason: Some("end_turn".to_string()),
            usage: None,
        }
    }

    /// The generated string: the first content element's text field
    pub fn first_text(&self) -> Result<&str> {
        let block = self.content.first().ok_or_else(|| {
            ChatError::MalformedResponse("response has no content blocks".to_string())
        })?;
        block.text.as_deref().ok_or_else(|| {
            ChatError::MalformedResponse("first content block has no text".to_string())
        })
    }
}

/// Natural-language retrieval query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalQuery {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchConfiguration {
    pub number_of_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfiguration {
    pub vector_search_configuration: VectorSearchConfiguration,
}

/// `Retrieve` request body; the knowledge-base id travels in the path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    pub retrieval_query: RetrievalQuery,
    pub retrieval_configuration: RetrievalConfiguration,
}

impl RetrieveRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            retrieval_query: RetrievalQuery { text: query.into() },
            retrieval_configuration: RetrievalConfiguration {
                vector_search_configuration: VectorSearchConfiguration {
                    number_of_results: top_k,
                },
            },
        }
    }

    pub fn query(&self) -> &str {
        &self.retrieval_query.text
    }

    pub fn top_k(&self) -> usize {
        self.retrieval_configuration
            .vector_search_configuration
            .number_of_results
    }
}

/// `Retrieve` response body
///
/// Hits stay untyped here; their content field comes in several shapes and
/// is normalized by the retrieval engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    #[serde(default)]
    pub retrieval_results: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invoke_request_wire_shape() {
        let request = InvokeRequest::single_turn("hello", 10, 0.0, 0.1);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "anthropic_version": "bedrock-2023-05-31",
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hello"}]}],
                "max_tokens": 10,
                "temperature": 0.0,
                "top_p": 0.1
            })
        );
        assert_eq!(request.prompt_text(), Some("hello"));
    }

    #[test]
    fn test_retrieve_request_wire_shape() {
        let request = RetrieveRequest::new("What is an excavator?", 3);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "retrievalQuery": {"text": "What is an excavator?"},
                "retrievalConfiguration": {"vectorSearchConfiguration": {"numberOfResults": 3}}
            })
        );
    }

    #[test]
    fn test_invoke_response_first_text() {
        let response: InvokeResponse = serde_json::from_value(json!({
            "id": "msg_01",
            "content": [{"type": "text", "text": "Category E"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 120, "output_tokens": 3}
        }))
        .unwrap();

        assert_eq!(response.first_text().unwrap(), "Category E");
        assert_eq!(response.usage.unwrap().output_tokens, 3);
    }

    #[test]
    fn test_invoke_response_without_content_is_malformed() {
        let response: InvokeResponse = serde_json::from_value(json!({"content": []})).unwrap();
        assert!(matches!(response.first_text(), Err(ChatError::MalformedResponse(_))));
    }

    #[test]
    fn test_retrieve_response_missing_results() {
        let response: RetrieveResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.retrieval_results.is_empty());
    }
}
