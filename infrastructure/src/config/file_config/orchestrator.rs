//! Orchestrator configuration from TOML (`[orchestrator]` section)

use conductor_application::ExecutionParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    /// Maximum model rounds per turn
    pub max_depth: usize,
    /// Per-call tool deadline in seconds
    pub tool_timeout_secs: u64,
    /// Tool calls of one batch allowed to run at the same time
    pub max_parallel_tools: usize,
    /// Replaces the built-in system prompt
    pub system_prompt: Option<String>,
}

impl Default for FileOrchestratorConfig {
    fn default() -> Self {
        let params = ExecutionParams::default();
        Self {
            max_depth: params.max_depth,
            tool_timeout_secs: params.tool_timeout.as_secs(),
            max_parallel_tools: params.max_parallel_tools,
            system_prompt: None,
        }
    }
}

impl FileOrchestratorConfig {
    pub fn to_execution_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_max_depth(self.max_depth)
            .with_tool_timeout(Duration::from_secs(self.tool_timeout_secs))
            .with_max_parallel_tools(self.max_parallel_tools.max(1))
    }
}
