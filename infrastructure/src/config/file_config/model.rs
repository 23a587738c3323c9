//! Model endpoint configuration from TOML (`[model]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    /// Base URL of an OpenAI-compatible API
    pub url: String,
    pub model: String,
    /// Inline API key. Prefer `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            timeout_secs: 120,
            temperature: None,
        }
    }
}

impl FileModelConfig {
    /// The inline key if set, otherwise the value of `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), self.api_key_env.as_deref())
    }
}

pub(crate) fn resolve_key(inline: Option<&str>, env: Option<&str>) -> Option<String> {
    inline
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| env.and_then(|name| std::env::var(name).ok()))
        .filter(|k| !k.is_empty())
}
