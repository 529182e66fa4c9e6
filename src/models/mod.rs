//! Bedrock model catalogue
//!
//! Lists the foundation models the chat shell can switch between.

pub mod types;

pub use types::ModelId;
