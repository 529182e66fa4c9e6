//! Prompt moderation
//!
//! Screens each question before any retrieval or generation happens.

pub mod classifier;

pub use classifier::{classification_prompt, Category, PromptClassifier, Verdict};
