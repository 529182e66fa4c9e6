//! Grounded prompt assembly and reference formatting
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rag::retrieval::RetrievalRecord;

/// Visible boundary between passages in the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Context placeholder when no passage had any text
pub const EMPTY_CONTEXT: &str = "N/A";

/// Introduces the references appended under an answer
pub const REFERENCES_HEADER: &str = "\n\n---\nRetrieved references:\n";

/// System instruction placed ahead of the context block
pub const DEFAULT_INSTRUCTION: &str = "You are a heavy machinery assistant. Answer the user's question ONLY using the context. \
If the context does not contain the answer, reply with \"I don't have that information.\" \
Respond in the same language as the question.";

/// A retrieved passage that named its source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub source: String,
    pub score: Option<f64>,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | score: {}", self.source, format_score(self.score))
    }
}

/// Score rounded to three decimals without trailing zeros, or `n/a`
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) if score.is_finite() => {
            let fixed = format!("{:.3}", score);
            let trimmed = fixed.trim_end_matches('0');
            if trimmed.ends_with('.') {
                format!("{}0", trimmed)
            } else {
                trimmed.to_string()
            }
        }
        Some(score) => score.to_string(),
        None => "n/a".to_string(),
    }
}

/// Context assembled from one retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Non-empty passage texts joined by [`CONTEXT_SEPARATOR`]
    pub text: String,
    /// Number of passages that contributed text
    pub passage_count: usize,
    /// Sourced records, in retrieval order
    pub references: Vec<Reference>,
}

impl AssembledContext {
    /// No passage contributed any text
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn has_references(&self) -> bool {
        !self.references.is_empty()
    }

    /// Context text, or the `N/A` placeholder
    pub fn text_or_placeholder(&self) -> &str {
        if self.text.is_empty() {
            EMPTY_CONTEXT
        } else {
            &self.text
        }
    }

    /// Answer followed by the references block
    pub fn append_references(&self, answer: &str) -> String {
        let lines: Vec<String> = self.references.iter().map(Reference::to_string).collect();
        format!("{}{}{}", answer, REFERENCES_HEADER, lines.join("\n"))
    }
}

/// Builds the grounded prompt sent to the answer generator
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    instruction: String,
}

impl ContextBuilder {
    /// Create new context builder with the default instruction
    pub fn new() -> Self {
        Self {
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }

    /// Create with a custom system instruction
    pub fn with_instruction(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Join non-empty passage texts and collect sourced records
    pub fn build(&self, records: &[RetrievalRecord]) -> AssembledContext {
        let passages: Vec<&str> = records
            .iter()
            .filter(|r| r.has_text())
            .map(|r| r.text.as_str())
            .collect();

        let references = records
            .iter()
            .filter_map(|r| {
                r.source.as_ref().map(|source| Reference {
                    source: source.clone(),
                    score: r.score,
                })
            })
            .collect();

        AssembledContext {
            text: passages.join(CONTEXT_SEPARATOR),
            passage_count: passages.len(),
            references,
        }
    }

    /// Instruction, context block and question in one prompt
    pub fn grounded_prompt(&self, context: &AssembledContext, question: &str) -> String {
        format!(
            "{}\n\nContext:\n{}\n\nQuestion: {}\nAnswer:",
            self.instruction,
            context.text_or_placeholder(),
            question
        )
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
