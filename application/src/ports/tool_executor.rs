//! Tool Executor port
//!
//! Defines the interface the orchestrator uses to describe and run tools.

use async_trait::async_trait;
use conductor_domain::{ConversationId, ToolCall, ToolDescriptor, ToolResult};

/// Per-call context handed to every tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub conversation_id: ConversationId,
}

impl ToolContext {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self { conversation_id }
    }
}

/// Port for tool execution
///
/// `execute` never fails with a Rust error: unknown tools, invalid
/// arguments and adapter faults all come back as failed [`ToolResult`]s.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Descriptors of all available tools, in registration order
    fn descriptors(&self) -> Vec<ToolDescriptor>;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.descriptors().iter().any(|d| d.name == name)
    }

    /// Execute a tool call
    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult;
}
