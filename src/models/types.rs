//! Supported Bedrock foundation models
//!
//! The chat shell only offers models that speak the Anthropic messages
//! body accepted by `InvokeModel`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ChatError;

/// Foundation model used for both moderation and answering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelId {
    /// Claude 3 Haiku, the default: cheap and fast enough for a guardrail call
    ClaudeHaiku3,
    /// Claude 3.5 Sonnet
    ClaudeSonnet35,
}

impl ModelId {
    /// Every selectable model, in menu order
    pub const ALL: [ModelId; 2] = [ModelId::ClaudeHaiku3, ModelId::ClaudeSonnet35];

    /// Bedrock model identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::ClaudeHaiku3 => "anthropic.claude-3-haiku-20240307-v1:0",
            ModelId::ClaudeSonnet35 => "anthropic.claude-3-5-sonnet-20240620-v1:0",
        }
    }

    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ModelId::ClaudeHaiku3 => "Claude 3 Haiku",
            ModelId::ClaudeSonnet35 => "Claude 3.5 Sonnet",
        }
    }

    /// Resolve a 1-based menu index as shown by `models` and `/model`
    pub fn from_index(index: usize) -> Option<ModelId> {
        index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

impl Default for ModelId {
    fn default() -> Self {
        ModelId::ClaudeHaiku3
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == trimmed)
            .ok_or_else(|| {
                ChatError::ConfigError(format!(
                    "Unsupported model '{}'. Supported: {}",
                    trimmed,
                    Self::ALL.map(|m| m.as_str()).join(", ")
                ))
            })
    }
}

impl TryFrom<String> for ModelId {
    type Error = ChatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelId> for String {
    fn from(model: ModelId) -> Self {
        model.as_str().to_string()
    }
}
