//! The closed set of tool execution strategies

use super::deployment::DeploymentTool;
use super::local::LocalTool;
use super::remote::RemoteTool;
use conductor_application::ports::tool_executor::ToolContext;
use conductor_domain::{ToolCall, ToolDescriptor, ToolResult};
use std::sync::Arc;

/// How a registered tool is executed.
pub enum ToolAdapter {
    /// In-process
    Local(Arc<dyn LocalTool>),
    /// One request to an external model-serving endpoint
    Deployment(DeploymentTool),
    /// Through a remote tool server session
    Remote(RemoteTool),
}

impl ToolAdapter {
    pub fn local(tool: impl LocalTool + 'static) -> Self {
        ToolAdapter::Local(Arc::new(tool))
    }

    pub fn describe(&self) -> ToolDescriptor {
        match self {
            ToolAdapter::Local(tool) => tool.descriptor(),
            ToolAdapter::Deployment(tool) => tool.descriptor().clone(),
            ToolAdapter::Remote(tool) => tool.descriptor().clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ToolAdapter::Local(_) => "local",
            ToolAdapter::Deployment(_) => "deployment",
            ToolAdapter::Remote(_) => "remote",
        }
    }

    pub async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult {
        match self {
            ToolAdapter::Local(tool) => tool.execute(ctx, call).await,
            ToolAdapter::Deployment(tool) => tool.execute(call).await,
            ToolAdapter::Remote(tool) => tool.execute(call).await,
        }
    }
}

impl std::fmt::Debug for ToolAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolAdapter")
            .field("kind", &self.kind())
            .field("name", &self.describe().name)
            .finish()
    }
}
