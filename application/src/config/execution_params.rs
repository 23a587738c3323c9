//! Execution parameters: orchestration loop control.
//!
//! [`ExecutionParams`] groups the static parameters that bound one
//! [`Orchestrator`](crate::use_cases::run_orchestrator::Orchestrator) run.
//! These are application-layer concerns, not domain policy.

use conductor_domain::orchestration::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Maximum number of model round trips in one run.
    pub max_depth: usize,
    /// Deadline for each individual tool call.
    pub tool_timeout: Duration,
    /// Maximum number of tool calls running at once.
    pub max_parallel_tools: usize,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            tool_timeout: Duration::from_secs(60),
            max_parallel_tools: 8,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_max_parallel_tools(mut self, max: usize) -> Self {
        self.max_parallel_tools = max.max(1);
        self
    }
}
