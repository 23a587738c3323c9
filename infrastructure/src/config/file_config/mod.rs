//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod extraction;
mod logging;
mod model;
mod orchestrator;
mod output;
mod retrieval;
mod tools;

pub use extraction::FileExtractionConfig;
pub use logging::FileLoggingConfig;
pub use model::FileModelConfig;
pub use orchestrator::FileOrchestratorConfig;
pub use output::FileOutputConfig;
pub use retrieval::{EmbeddingKind, FileEmbeddingConfig, FileRetrievalConfig};
pub use tools::{FileImageToolConfig, FileRemoteServerConfig, FileToolsConfig};

use conductor_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Loop bounds and system prompt
    pub orchestrator: FileOrchestratorConfig,
    /// Model endpoint
    pub model: FileModelConfig,
    /// Chunking, ranking, cache lifetime and embeddings
    pub retrieval: FileRetrievalConfig,
    /// Pagination and the retrieval threshold
    pub extraction: FileExtractionConfig,
    /// Deployment and remote tools
    pub tools: FileToolsConfig,
    pub logging: FileLoggingConfig,
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Issues with [`Severity::Error`](conductor_domain::Severity::Error)
    /// make the configuration unusable.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        // 1. Limits that must be positive
        let limits = [
            ("orchestrator.max_depth", self.orchestrator.max_depth as u64),
            ("orchestrator.tool_timeout_secs", self.orchestrator.tool_timeout_secs),
            ("retrieval.chunk_size", self.retrieval.chunk_size as u64),
            ("retrieval.top_k", self.retrieval.top_k as u64),
            ("retrieval.embedding.dimension", self.retrieval.embedding.dimension as u64),
            ("extraction.page_size", self.extraction.page_size as u64),
        ];
        for (field, value) in limits {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroLimit {
                        field: field.to_string(),
                    },
                    format!("{} must be greater than 0", field),
                ));
            }
        }
        if self.orchestrator.max_parallel_tools == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroLimit {
                    field: "orchestrator.max_parallel_tools".to_string(),
                },
                "orchestrator.max_parallel_tools is 0, using 1",
            ));
        }

        // 2. Chunking
        if self.retrieval.chunk_size > 0 && self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OverlapTooLarge,
                format!(
                    "retrieval.chunk_overlap ({}) must be smaller than chunk_size ({}), it will be reduced",
                    self.retrieval.chunk_overlap, self.retrieval.chunk_size
                ),
            ));
        }

        // 3. Endpoints
        if self.model.url.trim().is_empty() {
            issues.push(missing_url("model"));
        }
        let (kind, kind_issue) = self.retrieval.embedding.parse_kind();
        issues.extend(kind_issue);
        if kind == EmbeddingKind::Http
            && self
                .retrieval
                .embedding
                .url
                .as_deref()
                .is_none_or(|u| u.trim().is_empty())
        {
            issues.push(missing_url("retrieval.embedding"));
        }
        if self.tools.image.enabled && self.tools.image.url.trim().is_empty() {
            issues.push(missing_url("tools.image"));
        }

        // 4. Remote servers
        let mut seen = HashSet::new();
        for server in &self.tools.remote {
            if server.url.trim().is_empty() {
                issues.push(missing_url(&format!("tools.remote.{}", server.name)));
            }
            if server.max_consecutive_failures == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroLimit {
                        field: format!("tools.remote.{}.max_consecutive_failures", server.name),
                    },
                    format!(
                        "tools.remote '{}': max_consecutive_failures must be greater than 0",
                        server.name
                    ),
                ));
            }
            if !seen.insert(server.name.as_str()) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::DuplicateName {
                        section: "tools.remote".to_string(),
                        name: server.name.clone(),
                    },
                    format!("tools.remote: server name '{}' is declared more than once", server.name),
                ));
            }
        }

        issues
    }
}

fn missing_url(section: &str) -> ConfigIssue {
    ConfigIssue::error(
        ConfigIssueCode::MissingUrl {
            section: section.to_string(),
        },
        format!("[{}] requires a url", section),
    )
}
