//! Retrieval parameters: chunking, ranking and cache lifetime.

use conductor_domain::retrieval::splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Number of chunks returned per search
    pub top_k: usize,
    /// Indexes untouched for this long are evicted
    pub idle_ttl: Duration,
    /// How often the background sweeper looks for idle indexes
    pub sweep_interval: Duration,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: 3,
            idle_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}
