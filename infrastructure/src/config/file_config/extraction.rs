//! Extraction configuration from TOML (`[extraction]` section)

use conductor_domain::ExtractionPolicy;
use conductor_domain::extraction::policy::{DEFAULT_PAGE_SIZE, DEFAULT_RETRIEVAL_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExtractionConfig {
    /// Characters per page
    pub page_size: usize,
    /// Documents longer than this (in characters) are served through retrieval
    pub retrieval_threshold: usize,
    /// Timeout for fetching remote documents
    pub timeout_secs: u64,
    /// Extra directories local documents may be read from, besides the
    /// working directory and the files attached on the command line
    pub allowed_roots: Vec<PathBuf>,
}

impl Default for FileExtractionConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            retrieval_threshold: DEFAULT_RETRIEVAL_THRESHOLD,
            timeout_secs: 30,
            allowed_roots: Vec::new(),
        }
    }
}

impl FileExtractionConfig {
    pub fn to_policy(&self) -> ExtractionPolicy {
        ExtractionPolicy::new(self.page_size, self.retrieval_threshold)
    }
}
