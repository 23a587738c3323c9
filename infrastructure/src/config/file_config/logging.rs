//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript of model and tool events
    pub conversation_log: Option<PathBuf>,
    /// Diagnostic log file, rotated daily
    pub file: Option<PathBuf>,
}
