//! Knowledge-base retrieval and hit normalization
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::bedrock::{KnowledgeBaseService, RetrieveRequest};
use crate::errors::ChatError;
use crate::rag::content::RetrievedContent;

/// Default number of hits requested per query
pub const DEFAULT_TOP_K: usize = 3;

/// Location type whose record carries a canonical bucket URI
const S3_LOCATION: &str = "S3";

/// Metadata keys consulted, in order, when the location names no source
const METADATA_SOURCE_KEYS: [&str; 2] = ["source", "x-amz-bedrock-kb-source-uri"];

/// One normalized passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRecord {
    /// Joined text segments; empty when nothing was recoverable
    pub text: String,
    pub score: Option<f64>,
    pub source: Option<String>,
    pub metadata: Map<String, Value>,
    /// The hit exactly as the service returned it
    pub raw: Value,
}

impl RetrievalRecord {
    /// Normalize one raw hit
    pub fn from_hit(raw: Value) -> Self {
        let content = RetrievedContent::from_value(raw.get("content"));
        let metadata = raw
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let source = location_source(raw.get("location")).or_else(|| metadata_source(&metadata));

        Self {
            text: content.normalize(),
            score: raw.get("score").and_then(Value::as_f64),
            source,
            metadata,
            raw,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

fn location_source(location: Option<&Value>) -> Option<String> {
    let location = location?.as_object()?;
    let kind = location.get("type").and_then(Value::as_str);

    let source = if kind == Some(S3_LOCATION) {
        location
            .get("s3Location")
            .and_then(|s3| s3.get("uri"))
            .and_then(Value::as_str)
    } else {
        kind
    };

    source.filter(|s| !s.is_empty()).map(str::to_string)
}

fn metadata_source(metadata: &Map<String, Value>) -> Option<String> {
    METADATA_SOURCE_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Result of one retrieval call
///
/// A degraded call is reported, not raised: its record list is empty, which
/// downstream treats exactly like a genuine no-match.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Hits(Vec<RetrievalRecord>),
    Degraded { reason: String },
}

impl RetrievalOutcome {
    pub fn records(&self) -> &[RetrievalRecord] {
        match self {
            RetrievalOutcome::Hits(records) => records,
            RetrievalOutcome::Degraded { .. } => &[],
        }
    }

    pub fn into_records(self) -> Vec<RetrievalRecord> {
        match self {
            RetrievalOutcome::Hits(records) => records,
            RetrievalOutcome::Degraded { .. } => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RetrievalOutcome::Degraded { .. })
    }
}

/// Retrieval client over a knowledge-base service
#[derive(Clone)]
pub struct RetrievalEngine {
    service: Arc<dyn KnowledgeBaseService>,
}

impl RetrievalEngine {
    /// Create new retrieval engine
    pub fn new(service: Arc<dyn KnowledgeBaseService>) -> Self {
        Self { service }
    }

    /// Fetch at most `top_k` passages for `query` from `knowledge_base_id`
    pub async fn retrieve(
        &self,
        query: &str,
        knowledge_base_id: &str,
        top_k: usize,
    ) -> RetrievalOutcome {
        let request = RetrieveRequest::new(query, top_k);

        let response = self
            .service
            .retrieve(knowledge_base_id, &request)
            .await
            .map_err(|e| ChatError::RetrievalService(e.to_string()));

        match response {
            Ok(response) => {
                let records: Vec<RetrievalRecord> = response
                    .retrieval_results
                    .into_iter()
                    .map(RetrievalRecord::from_hit)
                    .collect();
                tracing::info!(knowledge_base_id, hits = records.len(), "retrieval complete");
                RetrievalOutcome::Hits(records)
            }
            Err(e) => {
                tracing::warn!(knowledge_base_id, error = %e, "error querying knowledge base");
                RetrievalOutcome::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use serde_json::json;

    /// Keys a real hit uses, mixed with noise
    const HIT_KEYS: [&str; 8] = [
        "content", "location", "score", "metadata", "type", "text", "s3Location", "uri",
    ];

    /// Any JSON value, shallow enough to keep cases small
    #[derive(Debug, Clone)]
    struct AnyHit(Value);

    fn any_value(g: &mut Gen, depth: usize) -> Value {
        let choices: &[u8] = if depth == 0 { &[0, 1, 2, 3] } else { &[0, 1, 2, 3, 4, 5] };
        match g.choose(choices).copied().unwrap_or(0) {
            0 => Value::Null,
            1 => Value::Bool(bool::arbitrary(g)),
            2 => json!(i32::arbitrary(g)),
            3 => Value::String(String::arbitrary(g)),
            4 => {
                let len = usize::arbitrary(g) % 4;
                Value::Array((0..len).map(|_| any_value(g, depth - 1)).collect())
            }
            _ => {
                let len = usize::arbitrary(g) % 5;
                let mut map = Map::new();
                for _ in 0..len {
                    let key = g.choose(&HIT_KEYS).copied().unwrap_or("text");
                    map.insert(key.to_string(), any_value(g, depth - 1));
                }
                Value::Object(map)
            }
        }
    }

    impl Arbitrary for AnyHit {
        fn arbitrary(g: &mut Gen) -> Self {
            AnyHit(any_value(g, 3))
        }
    }

    #[quickcheck]
    fn prop_any_hit_normalizes(hit: AnyHit) -> bool {
        let content = RetrievedContent::from_value(hit.0.get("content")).normalize();
        let record = RetrievalRecord::from_hit(hit.0.clone());

        record.text == content
            && record.raw == hit.0
            && record.source.as_deref().map_or(true, |s| !s.is_empty())
    }

    #[test]
    fn test_record_from_s3_hit() {
        let record = RetrievalRecord::from_hit(json!({
            "content": {"type": "TEXT", "text": "An excavator digs."},
            "location": {"type": "S3", "s3Location": {"uri": "s3://kb/doc1"}},
            "score": 0.92,
            "metadata": {"x-amz-bedrock-kb-chunk-id": "c1"}
        }));

        assert_eq!(record.text, "An excavator digs.");
        assert_eq!(record.score, Some(0.92));
        assert_eq!(record.source.as_deref(), Some("s3://kb/doc1"));
        assert_eq!(record.metadata.len(), 1);
        assert!(record.raw.get("location").is_some());
    }

    #[test]
    fn test_non_s3_location_uses_type() {
        let record = RetrievalRecord::from_hit(json!({
            "content": {"text": "page"},
            "location": {"type": "WEB", "webLocation": {"url": "https://example.com"}}
        }));
        assert_eq!(record.source.as_deref(), Some("WEB"));
    }

    #[test]
    fn test_metadata_source_fallback() {
        let record = RetrievalRecord::from_hit(json!({
            "content": {"text": "t"},
            "location": {"type": "S3", "s3Location": {}},
            "metadata": {"source": "manual.pdf"}
        }));
        assert_eq!(record.source.as_deref(), Some("manual.pdf"));

        let record = RetrievalRecord::from_hit(json!({
            "content": {"text": "t"},
            "metadata": {"x-amz-bedrock-kb-source-uri": "s3://kb/doc9"}
        }));
        assert_eq!(record.source.as_deref(), Some("s3://kb/doc9"));
    }

    #[test]
    fn test_location_wins_over_metadata() {
        let record = RetrievalRecord::from_hit(json!({
            "content": "x",
            "location": {"type": "S3", "s3Location": {"uri": "s3://kb/a"}},
            "metadata": {"source": "other"}
        }));
        assert_eq!(record.source.as_deref(), Some("s3://kb/a"));
    }

    #[test]
    fn test_bare_hit_normalizes_to_empty_record() {
        let record = RetrievalRecord::from_hit(json!({}));
        assert_eq!(record.text, "");
        assert!(!record.has_text());
        assert!(record.score.is_none());
        assert!(record.source.is_none());
        assert!(record.metadata.is_empty());
    }

    #[test]
    fn test_non_object_metadata_ignored() {
        let record = RetrievalRecord::from_hit(json!({"content": "x", "metadata": null}));
        assert!(record.metadata.is_empty());
        assert!(record.source.is_none());
    }

    #[test]
    fn test_degraded_outcome_has_no_records() {
        let outcome = RetrievalOutcome::Degraded {
            reason: "HTTP 500".to_string(),
        };
        assert!(outcome.is_degraded());
        assert!(outcome.records().is_empty());
        assert!(outcome.into_records().is_empty());
    }
}
