// Knowledge-base retrieval client
pub mod engine;

pub use engine::{RetrievalEngine, RetrievalOutcome, RetrievalRecord, DEFAULT_TOP_K};
