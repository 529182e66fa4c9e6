//! Normalization of retrieved passage content
//!
//! A knowledge-base hit carries its content as a structured segment, a list
//! of segments, or a bare scalar. All three reduce to one newline-joined
//! string, so downstream joins never see a missing text.

use serde_json::{Map, Value};

/// Shape of a hit's `content` field
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievedContent {
    /// Plain value (string, number, bool) or nothing at all
    Scalar(Value),
    /// One structured segment, normally `{"type": "TEXT", "text": ...}`
    Segment(Map<String, Value>),
    /// Several segments, each structured or plain
    SegmentList(Vec<Value>),
}

impl RetrievedContent {
    /// Classify a raw `content` value; absent content is an empty scalar
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => RetrievedContent::Segment(map.clone()),
            Some(Value::Array(items)) => RetrievedContent::SegmentList(items.clone()),
            Some(other) => RetrievedContent::Scalar(other.clone()),
            None => RetrievedContent::Scalar(Value::Null),
        }
    }

    /// Join every text-bearing piece with newlines
    pub fn normalize(&self) -> String {
        match self {
            RetrievedContent::Scalar(value) => scalar_text(value),
            RetrievedContent::Segment(map) => match segment_text(map) {
                Some(text) => text,
                // No usable text field: keep the segment visible as JSON
                None => Value::Object(map.clone()).to_string(),
            },
            RetrievedContent::SegmentList(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(map) => segment_text(map),
                    other => Some(scalar_text(other)),
                })
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A segment's `text` field, when present and non-empty. Non-string values
/// are rendered as JSON; `0`, `false` and empty containers count as empty.
fn segment_text(map: &Map<String, Value>) -> Option<String> {
    match map.get("text")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(fields) if fields.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use serde_json::json;

    fn normalize(value: Value) -> String {
        RetrievedContent::from_value(Some(&value)).normalize()
    }

    #[test]
    fn test_single_segment() {
        assert_eq!(normalize(json!({"text": "X"})), "X");
        assert_eq!(normalize(json!({"type": "TEXT", "text": "X"})), "X");
    }

    #[test]
    fn test_segment_list() {
        assert_eq!(normalize(json!([{"text": "A"}, {"text": "B"}])), "A\nB");
    }

    #[test]
    fn test_bare_string() {
        assert_eq!(normalize(json!("C")), "C");
    }

    #[test]
    fn test_missing_content_is_empty() {
        assert_eq!(RetrievedContent::from_value(None).normalize(), "");
        assert_eq!(normalize(Value::Null), "");
        assert_eq!(normalize(json!([])), "");
        assert_eq!(normalize(json!("")), "");
    }

    #[test]
    fn test_segment_without_text_renders_as_json() {
        let text = normalize(json!({"type": "IMAGE"}));
        assert_eq!(text, r#"{"type":"IMAGE"}"#);
    }

    #[test]
    fn test_non_string_text_field_is_rendered() {
        assert_eq!(normalize(json!({"text": 5})), "5");
        assert_eq!(normalize(json!({"text": 2.5})), "2.5");
        assert_eq!(normalize(json!({"text": true})), "true");
        assert_eq!(normalize(json!([{"text": 5}, {"text": "B"}])), "5\nB");
    }

    #[test]
    fn test_empty_text_field_falls_back_to_segment_json() {
        assert_eq!(normalize(json!({"text": 0})), r#"{"text":0}"#);
        assert_eq!(normalize(json!({"text": false})), r#"{"text":false}"#);
        assert_eq!(normalize(json!({"text": []})), r#"{"text":[]}"#);
        assert_eq!(normalize(json!([{"text": 0}, "kept"])), "kept");
    }

    #[test]
    fn test_list_skips_textless_segments_and_keeps_scalars() {
        let text = normalize(json!([
            {"type": "IMAGE"},
            "plain",
            {"text": ""},
            7,
            {"text": "B"}
        ]));
        assert_eq!(text, "plain\n7\nB");
    }

    #[test]
    fn test_classification() {
        assert!(matches!(
            RetrievedContent::from_value(Some(&json!({"text": "a"}))),
            RetrievedContent::Segment(_)
        ));
        assert!(matches!(
            RetrievedContent::from_value(Some(&json!([]))),
            RetrievedContent::SegmentList(_)
        ));
        assert!(matches!(
            RetrievedContent::from_value(Some(&json!(3.5))),
            RetrievedContent::Scalar(_)
        ));
    }

    #[quickcheck]
    fn prop_segment_list_keeps_every_nonempty_segment(texts: Vec<String>) -> bool {
        let items: Vec<Value> = texts.iter().map(|t| json!({ "text": t })).collect();
        let expected = texts
            .iter()
            .filter(|t| !t.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        normalize(Value::Array(items)) == expected
    }

    #[quickcheck]
    fn prop_bare_string_is_identity(text: String) -> bool {
        normalize(Value::String(text.clone())) == text
    }
}
