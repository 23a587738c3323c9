//! Tools configuration from TOML (`[tools]` section)
//!
//! Built-in document tools are always registered. The image generation
//! deployment and remote tool servers are opt-in:
//!
//! ```toml
//! [tools.image]
//! enabled = true
//! url = "http://localhost:8080/openai/deployments/dall-e-3/chat/completions"
//! api_key_env = "DIAL_API_KEY"
//!
//! [[tools.remote]]
//! name = "python"
//! url = "http://localhost:8050/mcp"
//! max_output_chars = 1000
//!
//! [[tools.remote]]
//! name = "web"
//! url = "http://localhost:8051/mcp"
//! headers = { Authorization = "Bearer local" }
//! ```

use crate::protocol::DEFAULT_MAX_CONSECUTIVE_FAILURES;
use crate::tools::IMAGE_GENERATION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    pub image: FileImageToolConfig,
    /// Remote tool servers, registered in this order
    pub remote: Vec<FileRemoteServerConfig>,
}

/// Image generation deployment (`[tools.image]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileImageToolConfig {
    pub enabled: bool,
    /// Tool name shown to the model
    pub name: String,
    /// Chat-completion style endpoint of the deployment
    pub url: String,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FileImageToolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: IMAGE_GENERATION.to_string(),
            url: String::new(),
            api_key_env: None,
            timeout_secs: 120,
        }
    }
}

impl FileImageToolConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        super::model::resolve_key(None, self.api_key_env.as_deref())
    }
}

/// One remote tool server (`[[tools.remote]]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRemoteServerConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
    /// Cap on the text returned by each call
    #[serde(default)]
    pub max_output_chars: Option<usize>,
    /// Extra HTTP headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Consecutive failed calls before the server is given up on
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,
}

fn default_remote_timeout() -> u64 {
    60
}

fn default_max_failures() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_FAILURES
}
