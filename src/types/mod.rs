//! Type definitions module
//!
//! Core types shared by the pipeline and the chat shell.

pub mod messages;

// Re-export commonly used types
pub use messages::{ChatHistory, ChatRole, ChatTurn};
