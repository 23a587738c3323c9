//! Embedding port
//!
//! Maps text to fixed-dimension vectors for retrieval.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// Dimension of every returned vector
    fn dimension(&self) -> usize;

    /// Embed each text, in order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}
