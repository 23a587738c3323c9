//! Tool Registry
//!
//! The [`ToolRegistry`] maps tool names to adapters and implements
//! [`ToolExecutorPort`]. It is populated once at startup and read-only
//! afterwards.
//!
//! # Usage
//!
//! ```ignore
//! let mut registry = ToolRegistry::new();
//! registry.register(ToolAdapter::local(FileContentTool::new(reader.clone())));
//! registry.register(ToolAdapter::Deployment(DeploymentTool::image_generation("image_generation", image)));
//! registry.register_remote(python_client, Some(1000)).await?;
//!
//! let result = registry.execute(&ctx, &ToolCall::new("call_1", "execute_code")).await;
//! ```
//!
//! # Name collisions
//!
//! The first adapter registered under a name keeps it. Later registrations
//! of the same name are skipped with a warning, so built-in tools registered
//! before remote servers cannot be shadowed by them.

use super::adapter::ToolAdapter;
use super::remote::RemoteTool;
use crate::protocol::{ProtocolClient, ProtocolError};
use async_trait::async_trait;
use conductor_application::ports::tool_executor::{ToolContext, ToolExecutorPort};
use conductor_domain::{
    SchemaToolValidator, ToolCall, ToolDescriptor, ToolError, ToolResult, ToolValidator,
};
use std::collections::HashMap;
use std::sync::Arc;

struct Entry {
    descriptor: ToolDescriptor,
    adapter: ToolAdapter,
}

pub struct ToolRegistry {
    /// Adapters in registration order
    entries: Vec<Entry>,
    /// Tool name -> index into `entries`
    by_name: HashMap<String, usize>,
    validator: Box<dyn ToolValidator>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            validator: Box::new(SchemaToolValidator),
        }
    }

    pub fn with_validator(mut self, validator: impl ToolValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Register an adapter. Returns `false` if the name was already taken.
    pub fn register(&mut self, adapter: ToolAdapter) -> bool {
        let descriptor = adapter.describe();

        if let Some(&existing) = self.by_name.get(&descriptor.name) {
            tracing::warn!(
                tool = %descriptor.name,
                kept = self.entries[existing].adapter.kind(),
                skipped = adapter.kind(),
                "Tool name already registered, keeping the first"
            );
            return false;
        }

        tracing::debug!(tool = %descriptor.name, kind = adapter.kind(), "Registered tool");
        self.by_name
            .insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(Entry {
            descriptor,
            adapter,
        });
        true
    }

    /// Connect to a remote tool server and register every tool it offers.
    ///
    /// A server whose handshake fails contributes no tools. Returns the
    /// number of tools registered.
    pub async fn register_remote(
        &mut self,
        client: Arc<ProtocolClient>,
        max_output_chars: Option<usize>,
    ) -> Result<usize, ProtocolError> {
        if let Err(e) = client.connect().await {
            tracing::warn!(server = client.name(), error = %e, "Skipping unreachable tool server");
            return Err(e);
        }

        let descriptors = client.list_tools().await?;
        let mut registered = 0;
        for descriptor in descriptors {
            let tool = RemoteTool::new(descriptor, Arc::clone(&client))
                .with_max_output_chars(max_output_chars);
            if self.register(ToolAdapter::Remote(tool)) {
                registered += 1;
            }
        }

        tracing::info!(server = client.name(), tools = registered, "Registered remote tools");
        Ok(registered)
    }

    /// Descriptors of every registered tool, in registration order.
    pub fn describe(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolAdapter, ToolError> {
        self.lookup(name)
            .map(|e| &e.adapter)
            .ok_or_else(|| ToolError::not_found(name))
    }

    fn lookup(&self, name: &str) -> Option<&Entry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.descriptor.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let mut tools_per_kind = HashMap::new();
        for entry in &self.entries {
            *tools_per_kind.entry(entry.adapter.kind()).or_insert(0) += 1;
        }

        RegistryStats {
            total_tools: self.entries.len(),
            tools_per_kind,
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the registry
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub total_tools: usize,
    pub tools_per_kind: HashMap<&'static str, usize>,
}

#[async_trait]
impl ToolExecutorPort for ToolRegistry {
    fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.describe()
    }

    fn has_tool(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult {
        let Some(entry) = self.lookup(&call.tool_name) else {
            tracing::debug!(tool = %call.tool_name, "Unknown tool requested");
            return ToolResult::failure(&call.id, &call.tool_name, ToolError::not_found(&call.tool_name));
        };

        if let Err(message) = self.validator.validate(call, &entry.descriptor) {
            tracing::debug!(tool = %call.tool_name, %message, "Rejected tool arguments");
            return ToolResult::failure(&call.id, &call.tool_name, ToolError::invalid_argument(message));
        }

        tracing::trace!(tool = %call.tool_name, kind = entry.adapter.kind(), "Executing tool");
        entry.adapter.execute(ctx, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ConnectionState, Transport, TransportReply};
    use crate::tools::local::LocalTool;
    use conductor_domain::{ConversationId, ToolErrorKind, ToolParameter};
    use serde_json::{Value, json};

    struct Echo {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl LocalTool for Echo {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "Echo")
                .with_parameter(ToolParameter::new("text", "Text to echo", true))
        }

        async fn execute(&self, _ctx: &ToolContext, call: &ToolCall) -> ToolResult {
            ToolResult::success(&call.id, self.name, format!("{}: {}", self.reply, call.get_string("text").unwrap_or("")))
        }
    }

    /// A server exposing `search` and `execute_code`, or refusing connections.
    struct ToolServer {
        reachable: bool,
    }

    #[async_trait]
    impl Transport for ToolServer {
        async fn send(
            &self,
            message: &Value,
            _session_id: Option<&str>,
        ) -> crate::protocol::error::Result<TransportReply> {
            if !self.reachable {
                return Err(ProtocolError::Transport("connection refused".into()));
            }
            let Some(id) = message.get("id").cloned() else {
                return Ok(TransportReply::default());
            };
            let result = match message["method"].as_str() {
                Some("tools/list") => json!({"tools": [
                    {"name": "search", "description": "Web search",
                     "inputSchema": {"type": "object", "properties": {"query": {"type": "string"}}, "required": ["query"]}},
                    {"name": "execute_code", "description": "Run Python",
                     "inputSchema": {"type": "object", "properties": {"code": {"type": "string"}}, "required": ["code"]}}
                ]}),
                Some("tools/call") => json!({"content": [{"type": "text", "text": format!("remote {}", message["params"]["name"].as_str().unwrap_or(""))}]}),
                _ => json!({"protocolVersion": "2025-03-26"}),
            };
            Ok(TransportReply {
                frames: vec![json!({"jsonrpc": "2.0", "id": id, "result": result})],
                session_id: None,
            })
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new(ConversationId::new("c1"))
    }

    #[tokio::test]
    async fn test_registry_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolAdapter::local(Echo { name: "echo", reply: "first" }));

        let call = ToolCall::new("call_1", "echo").with_arg("text", "hi");
        let result = registry.execute(&ctx(), &call).await;

        assert!(result.is_success());
        assert_eq!(result.output(), Some("first: hi"));
    }

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let registry = ToolRegistry::new();

        let result = registry
            .execute(&ctx(), &ToolCall::new("call_1", "unknown_tool"))
            .await;

        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code(), "NOT_FOUND");
        assert!(registry.resolve("unknown_tool").is_err());
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_rejected_before_execution() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolAdapter::local(Echo { name: "echo", reply: "first" }));

        let call = ToolCall::new("call_1", "echo").with_arg("text", 42);
        let result = registry.execute(&ctx(), &call).await;

        assert_eq!(result.error().unwrap().kind, ToolErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_first_registration_wins() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(ToolAdapter::local(Echo { name: "echo", reply: "first" })));
        assert!(!registry.register(ToolAdapter::local(Echo { name: "echo", reply: "second" })));

        let call = ToolCall::new("call_1", "echo").with_arg("text", "x");
        let result = registry.execute(&ctx(), &call).await;

        assert_eq!(registry.len(), 1);
        assert_eq!(result.output(), Some("first: x"));
    }

    #[tokio::test]
    async fn test_register_remote_wraps_each_tool() {
        let client = Arc::new(ProtocolClient::new("web", Arc::new(ToolServer { reachable: true })));
        let mut registry = ToolRegistry::new();
        registry.register(ToolAdapter::local(Echo { name: "search", reply: "local" }));

        let registered = registry.register_remote(client, None).await.unwrap();

        assert_eq!(registered, 1);
        assert_eq!(registry.names(), vec!["search", "execute_code"]);
        assert_eq!(registry.stats().tools_per_kind.get("remote"), Some(&1));

        let call = ToolCall::new("call_1", "execute_code").with_arg("code", "print(1)");
        let result = registry.execute(&ctx(), &call).await;
        assert_eq!(result.output(), Some("remote execute_code"));
    }

    #[tokio::test]
    async fn test_unreachable_server_registers_nothing() {
        let client = Arc::new(ProtocolClient::new("py", Arc::new(ToolServer { reachable: false })));
        let mut registry = ToolRegistry::new();

        let err = registry
            .register_remote(Arc::clone(&client), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ProtocolError::Handshake { .. }));
        assert_eq!(client.state(), ConnectionState::Failed);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_describe_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolAdapter::local(Echo { name: "b", reply: "" }));
        registry.register(ToolAdapter::local(Echo { name: "a", reply: "" }));

        let names: Vec<_> = registry.describe().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(registry.has_tool("a"));
    }
}
