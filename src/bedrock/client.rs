//! Bedrock HTTP client
//!
//! One `BedrockClient` is built at startup and shared by the classifier,
//! retriever and generator. `Retrieve` on bedrock-agent-runtime is signed
//! with SigV4; `InvokeModel` on bedrock-runtime uses the Bedrock API key as
//! a bearer token when one is set and SigV4 otherwise. No retries happen
//! here; callers decide how a failure degrades.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::bedrock::service::{KnowledgeBaseService, ModelService};
use crate::bedrock::signing::SigV4Signer;
use crate::bedrock::types::{InvokeRequest, InvokeResponse, RetrieveRequest, RetrieveResponse};
use crate::cli::config::BedrockConfig;
use crate::errors::{ChatError, Result};
use crate::models::ModelId;

const JSON: &str = "application/json";

/// Reachability of one Bedrock endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub name: &'static str,
    pub url: String,
    pub reachable: bool,
    pub detail: String,
}

/// How one request is authenticated
#[derive(Debug, Clone, Copy)]
enum Auth<'a> {
    Bearer(&'a str),
    SigV4(&'a SigV4Signer),
    Anonymous,
}

/// Bedrock client for the runtime and agent-runtime endpoints
#[derive(Debug, Clone)]
pub struct BedrockClient {
    http: Client,
    runtime_endpoint: String,
    agent_runtime_endpoint: String,
    api_key: Option<String>,
    signer: Option<Arc<SigV4Signer>>,
}

impl BedrockClient {
    /// Build a client from configuration. The API key is read from the
    /// environment variable the configuration names; SigV4 credentials come
    /// from the default AWS chain unless `use_aws_credentials` is off.
    pub async fn from_config(config: &BedrockConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        let signer = if config.use_aws_credentials {
            SigV4Signer::from_default_chain(&config.region).await
        } else {
            None
        };

        if signer.is_none() {
            tracing::warn!("knowledge-base retrieval will not be SigV4 signed");
        }
        if api_key.is_none() && signer.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "no Bedrock API key or AWS credentials found; requests will be sent unauthenticated"
            );
        }

        let client = Self::with_endpoints(
            &config.runtime_url(),
            &config.agent_runtime_url(),
            api_key,
            config.request_timeout(),
        )?;
        Ok(match signer {
            Some(signer) => client.with_signer(signer),
            None => client,
        })
    }

    /// Build a client against explicit endpoints
    pub fn with_endpoints(
        runtime_endpoint: &str,
        agent_runtime_endpoint: &str,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatError::HttpError)?;

        Ok(Self {
            http,
            runtime_endpoint: runtime_endpoint.trim_end_matches('/').to_string(),
            agent_runtime_endpoint: agent_runtime_endpoint.trim_end_matches('/').to_string(),
            api_key,
            signer: None,
        })
    }

    /// Sign requests with SigV4
    pub fn with_signer(mut self, signer: SigV4Signer) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// `InvokeModel` URL for a model
    pub fn invoke_url(&self, model: ModelId) -> String {
        format!(
            "{}/model/{}/invoke",
            self.runtime_endpoint,
            urlencoding::encode(model.as_str())
        )
    }

    /// `Retrieve` URL for a knowledge base
    pub fn retrieve_url(&self, knowledge_base_id: &str) -> String {
        format!(
            "{}/knowledgebases/{}/retrieve",
            self.agent_runtime_endpoint,
            urlencoding::encode(knowledge_base_id)
        )
    }

    pub fn runtime_endpoint(&self) -> &str {
        &self.runtime_endpoint
    }

    pub fn agent_runtime_endpoint(&self) -> &str {
        &self.agent_runtime_endpoint
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// API key first, SigV4 when no key is set
    fn runtime_auth(&self) -> Auth<'_> {
        match (&self.api_key, &self.signer) {
            (Some(key), _) => Auth::Bearer(key),
            (None, Some(signer)) => Auth::SigV4(signer),
            (None, None) => Auth::Anonymous,
        }
    }

    /// SigV4 first; the API key is only a last resort here
    fn agent_runtime_auth(&self) -> Auth<'_> {
        match (&self.signer, &self.api_key) {
            (Some(signer), _) => Auth::SigV4(signer),
            (None, Some(key)) => Auth::Bearer(key),
            (None, None) => Auth::Anonymous,
        }
    }

    async fn post_json<B, R>(&self, url: &str, body: &B, auth: Auth<'_>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON);

        match auth {
            Auth::Bearer(key) => request = request.bearer_auth(key),
            Auth::SigV4(signer) => {
                let signed = signer
                    .sign("POST", url, &[("content-type", JSON)], &payload)
                    .await?;
                for (name, value) in signed {
                    request = request.header(name, value);
                }
            }
            Auth::Anonymous => {}
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ChatError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ChatError::MalformedResponse(format!("{} ({})", e, url)))
    }

    /// Check that both endpoints answer HTTP at all. Any status counts as
    /// reachable; only connection-level failures do not.
    pub async fn check_reachability(&self) -> Vec<EndpointStatus> {
        let targets = [
            ("bedrock-runtime", self.runtime_endpoint.clone()),
            ("bedrock-agent-runtime", self.agent_runtime_endpoint.clone()),
        ];

        let mut statuses = Vec::with_capacity(targets.len());
        for (name, url) in targets {
            let status = match self
                .http
                .get(&url)
                .timeout(Duration::from_secs(5))
                .send()
                .await
            {
                Ok(response) => EndpointStatus {
                    name,
                    url,
                    reachable: true,
                    detail: format!("HTTP {}", response.status().as_u16()),
                },
                Err(e) => EndpointStatus {
                    name,
                    url,
                    reachable: false,
                    detail: e.to_string(),
                },
            };
            statuses.push(status);
        }
        statuses
    }
}

#[async_trait]
impl ModelService for BedrockClient {
    async fn invoke(&self, model: ModelId, request: &InvokeRequest) -> Result<InvokeResponse> {
        let url = self.invoke_url(model);
        tracing::debug!(model = %model, max_tokens = request.max_tokens, "invoking model");
        let response: InvokeResponse = self.post_json(&url, request, self.runtime_auth()).await?;
        if let Some(usage) = response.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = response.stop_reason.as_deref().unwrap_or("unknown"),
                "model usage"
            );
        }
        Ok(response)
    }
}

#[async_trait]
impl KnowledgeBaseService for BedrockClient {
    async fn retrieve(
        &self,
        knowledge_base_id: &str,
        request: &RetrieveRequest,
    ) -> Result<RetrieveResponse> {
        let url = self.retrieve_url(knowledge_base_id);
        tracing::debug!(knowledge_base_id, top_k = request.top_k(), "retrieving passages");
        self.post_json(&url, request, self.agent_runtime_auth())
            .await
    }
}
