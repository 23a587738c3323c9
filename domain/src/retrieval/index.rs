//! Per-conversation retrieval index

use crate::conversation::entities::ConversationId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// A piece of a document as stored in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Document reference the chunk was cut from
    pub source: String,
    pub text: String,
}

impl Chunk {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    /// Content fingerprint used for deduplication.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Ordered set of embedded chunks owned by one conversation.
#[derive(Debug, Clone)]
pub struct RetrievalIndex {
    conversation_id: ConversationId,
    entries: Vec<Entry>,
    fingerprints: HashSet<String>,
}

impl RetrievalIndex {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            entries: Vec::new(),
            fingerprints: HashSet::new(),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, chunk: &Chunk) -> bool {
        self.fingerprints.contains(&chunk.fingerprint())
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.entries.iter().any(|e| e.chunk.source == source)
    }

    /// Number of chunks stored for `source`.
    pub fn source_len(&self, source: &str) -> usize {
        self.entries.iter().filter(|e| e.chunk.source == source).count()
    }

    /// Insert a chunk unless an identical one (same source and text) is
    /// already present. Returns whether it was inserted.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> bool {
        if !self.fingerprints.insert(chunk.fingerprint()) {
            return false;
        }
        self.entries.push(Entry { chunk, embedding });
        true
    }

    /// Top-`k` chunks by cosine similarity, best first. Ties keep insertion
    /// order.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        self.search_filtered(query_embedding, k, |_| true)
    }

    /// Like [`search`](Self::search), restricted to one document.
    pub fn search_source(&self, query_embedding: &[f32], k: usize, source: &str) -> Vec<ScoredChunk> {
        self.search_filtered(query_embedding, k, |chunk| chunk.source == source)
    }

    fn search_filtered<F>(&self, query_embedding: &[f32], k: usize, keep: F) -> Vec<ScoredChunk>
    where
        F: Fn(&Chunk) -> bool,
    {
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .filter(|e| keep(&e.chunk))
            .map(|e| ScoredChunk {
                chunk: e.chunk.clone(),
                score: cosine_similarity(query_embedding, &e.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity; 0.0 for mismatched dimensions or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
