//! In-memory doubles of the Bedrock service traits
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use bedrock_chat::bedrock::{
    InvokeRequest, InvokeResponse, KnowledgeBaseService, ModelService, RetrieveRequest,
    RetrieveResponse,
};
use bedrock_chat::errors::{ChatError, Result};
use bedrock_chat::models::ModelId;
use bedrock_chat::{ChatPipeline, ChatSettings};

/// Marker present only in the classification prompt
const CLASSIFIER_MARKER: &str = "<user_request>";

/// Scripted outcome of one kind of call
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }

    fn to_result(&self) -> Result<InvokeResponse> {
        match self {
            Reply::Text(text) => Ok(InvokeResponse::from_text(text.clone())),
            Reply::Fail(body) => Err(ChatError::ServiceError {
                status: 500,
                body: body.clone(),
            }),
        }
    }
}

/// Model double that answers classifier and generator prompts separately
pub struct ScriptedModel {
    classifier: Reply,
    answer: Reply,
    classify_calls: Mutex<Vec<InvokeRequest>>,
    generate_calls: Mutex<Vec<(ModelId, InvokeRequest)>>,
}

impl ScriptedModel {
    pub fn new(classifier: Reply, answer: Reply) -> Self {
        Self {
            classifier,
            answer,
            classify_calls: Mutex::new(Vec::new()),
            generate_calls: Mutex::new(Vec::new()),
        }
    }

    /// Allows every question and answers with `answer`
    pub fn allowing(answer: &str) -> Self {
        Self::new(Reply::text("Category E"), Reply::text(answer))
    }

    pub fn classify_count(&self) -> usize {
        self.classify_calls.lock().unwrap().len()
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.lock().unwrap().len()
    }

    pub fn last_classify_request(&self) -> Option<InvokeRequest> {
        self.classify_calls.lock().unwrap().last().cloned()
    }

    pub fn last_generate_request(&self) -> Option<(ModelId, InvokeRequest)> {
        self.generate_calls.lock().unwrap().last().cloned()
    }

    pub fn last_answer_prompt(&self) -> Option<String> {
        self.last_generate_request()
            .and_then(|(_, request)| request.prompt_text().map(str::to_string))
    }
}

#[async_trait]
impl ModelService for ScriptedModel {
    async fn invoke(&self, model: ModelId, request: &InvokeRequest) -> Result<InvokeResponse> {
        let is_classification = request
            .prompt_text()
            .map(|text| text.contains(CLASSIFIER_MARKER))
            .unwrap_or(false);

        if is_classification {
            self.classify_calls.lock().unwrap().push(request.clone());
            self.classifier.to_result()
        } else {
            self.generate_calls
                .lock()
                .unwrap()
                .push((model, request.clone()));
            self.answer.to_result()
        }
    }
}

/// Knowledge-base double returning fixed hits or a fixed failure
pub struct ScriptedKnowledgeBase {
    hits: std::result::Result<Vec<Value>, String>,
    calls: Mutex<Vec<(String, RetrieveRequest)>>,
}

impl ScriptedKnowledgeBase {
    pub fn with_hits(hits: Vec<Value>) -> Self {
        Self {
            hits: Ok(hits),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_hits(Vec::new())
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            hits: Err(reason.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<(String, RetrieveRequest)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl KnowledgeBaseService for ScriptedKnowledgeBase {
    async fn retrieve(
        &self,
        knowledge_base_id: &str,
        request: &RetrieveRequest,
    ) -> Result<RetrieveResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((knowledge_base_id.to_string(), request.clone()));

        match &self.hits {
            Ok(hits) => Ok(RetrieveResponse {
                retrieval_results: hits.clone(),
                next_token: None,
            }),
            Err(reason) => Err(ChatError::ServiceError {
                status: 503,
                body: reason.clone(),
            }),
        }
    }
}

/// An S3-located hit as the retrieve API returns it
pub fn s3_hit(text: &str, uri: &str, score: f64) -> Value {
    json!({
        "content": {"type": "TEXT", "text": text},
        "location": {"type": "S3", "s3Location": {"uri": uri}},
        "score": score,
        "metadata": {"x-amz-bedrock-kb-chunk-id": "chunk-1"}
    })
}

/// A hit with neither location nor source metadata
pub fn unsourced_hit(text: &str, score: f64) -> Value {
    json!({
        "content": {"text": text},
        "score": score
    })
}

pub fn settings(knowledge_base_id: &str) -> ChatSettings {
    ChatSettings {
        knowledge_base_id: knowledge_base_id.to_string(),
        ..ChatSettings::default()
    }
}

pub fn pipeline(
    model: &Arc<ScriptedModel>,
    knowledge_base: &Arc<ScriptedKnowledgeBase>,
) -> ChatPipeline {
    ChatPipeline::new(model.clone(), knowledge_base.clone())
}
