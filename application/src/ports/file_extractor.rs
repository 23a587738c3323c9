//! File extraction port
//!
//! Serves a document's plain text as bounded, cursor-addressed slices.

use async_trait::async_trait;
use conductor_domain::ExtractedPage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Failed to read document {reference}: {message}")]
    ReadFailed { reference: String, message: String },

    #[error("Unsupported document reference: {0}")]
    Unsupported(String),
}

#[async_trait]
pub trait FileExtractorPort: Send + Sync {
    /// Return the slice of `document_ref` starting at character `cursor`.
    async fn extract(
        &self,
        document_ref: &str,
        cursor: usize,
        page_size: usize,
    ) -> Result<ExtractedPage, ExtractionError>;
}
