//! Retrieval adapters

pub mod embedding;

pub use embedding::{DEFAULT_EMBEDDING_DIMENSION, HashingEmbedder, HttpEmbeddingClient};
