//! Retrieval configuration from TOML (`[retrieval]` section)
//!
//! ```toml
//! [retrieval]
//! chunk_size = 500
//! chunk_overlap = 50
//! top_k = 3
//! idle_ttl_secs = 3600
//!
//! [retrieval.embedding]
//! kind = "http"
//! url = "https://api.openai.com/v1"
//! model = "text-embedding-3-small"
//! dimension = 1536
//! api_key_env = "OPENAI_API_KEY"
//! ```

use conductor_application::RetrievalParams;
use conductor_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetrievalConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    /// Idle time after which a conversation's index is dropped
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub embedding: FileEmbeddingConfig,
}

impl Default for FileRetrievalConfig {
    fn default() -> Self {
        let params = RetrievalParams::default();
        Self {
            chunk_size: params.chunk_size,
            chunk_overlap: params.chunk_overlap,
            top_k: params.top_k,
            idle_ttl_secs: params.idle_ttl.as_secs(),
            sweep_interval_secs: params.sweep_interval.as_secs(),
            embedding: FileEmbeddingConfig::default(),
        }
    }
}

impl FileRetrievalConfig {
    pub fn to_retrieval_params(&self) -> RetrievalParams {
        RetrievalParams {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            top_k: self.top_k,
            idle_ttl: Duration::from_secs(self.idle_ttl_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    /// Local feature hashing
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEmbeddingConfig {
    /// "hashing" or "http"
    pub kind: String,
    pub dimension: usize,
    pub url: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FileEmbeddingConfig {
    fn default() -> Self {
        Self {
            kind: "hashing".to_string(),
            dimension: 384,
            url: None,
            model: None,
            api_key_env: None,
            timeout_secs: 30,
        }
    }
}

impl FileEmbeddingConfig {
    /// Parse `kind`, falling back to hashing on unknown values.
    pub fn parse_kind(&self) -> (EmbeddingKind, Option<ConfigIssue>) {
        match self.kind.to_lowercase().as_str() {
            "hashing" | "hash" => (EmbeddingKind::Hashing, None),
            "http" | "openai" => (EmbeddingKind::Http, None),
            other => (
                EmbeddingKind::Hashing,
                Some(ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "retrieval.embedding.kind".to_string(),
                        value: other.to_string(),
                        valid_values: vec!["hashing".to_string(), "http".to_string()],
                    },
                    format!(
                        "retrieval.embedding.kind: unknown value '{}', falling back to 'hashing'",
                        other
                    ),
                )),
            ),
        }
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        super::model::resolve_key(None, self.api_key_env.as_deref())
    }
}
