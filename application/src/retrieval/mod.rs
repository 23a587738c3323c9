//! Retrieval
//!
//! Per-conversation semantic indexes and the document reader built on them.

pub mod cache;
pub mod document_reader;

pub use cache::RetrievalCache;
pub use document_reader::{DocumentAnswer, DocumentReadError, DocumentReader};
