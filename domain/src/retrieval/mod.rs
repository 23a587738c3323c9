//! Retrieval domain module
//!
//! Pure building blocks for answering questions over large documents:
//! the [`TextSplitter`] cuts documents into chunks, and a
//! [`RetrievalIndex`] holds one conversation's embedded chunks and ranks
//! them against a query embedding. Embedding and caching live outside the
//! domain.

pub mod index;
pub mod splitter;

pub use index::{Chunk, RetrievalIndex, ScoredChunk, cosine_similarity};
pub use splitter::TextSplitter;
