//! Tools hosted on a remote tool server
//!
//! One [`RemoteTool`] per tool discovered on a server, all sharing the
//! server's [`ProtocolClient`].

use crate::protocol::messages::{CallToolResult, ContentBlock, INVALID_PARAMS};
use crate::protocol::{ProtocolClient, ProtocolError};
use conductor_domain::core::string::truncate_output;
use conductor_domain::{Artifact, ToolCall, ToolDescriptor, ToolError, ToolResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct RemoteTool {
    descriptor: ToolDescriptor,
    client: Arc<ProtocolClient>,
    max_output_chars: Option<usize>,
}

impl RemoteTool {
    pub fn new(descriptor: ToolDescriptor, client: Arc<ProtocolClient>) -> Self {
        Self {
            descriptor,
            client,
            max_output_chars: None,
        }
    }

    pub fn with_max_output_chars(mut self, max: Option<usize>) -> Self {
        self.max_output_chars = max;
        self
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub fn server(&self) -> &str {
        self.client.name()
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let name = self.descriptor.name.as_str();
        debug!(tool = name, server = self.client.name(), "Invoking remote tool");

        match self.client.invoke(name, &call.arguments_json()).await {
            Ok(result) if result.is_error => ToolResult::failure(
                &call.id,
                name,
                ToolError::execution_failed(self.render_text(&result)),
            ),
            Ok(result) => self.into_result(call, result),
            Err(e) => ToolResult::failure(&call.id, name, protocol_error(self.client.name(), e)),
        }
    }

    fn into_result(&self, call: &ToolCall, result: CallToolResult) -> ToolResult {
        let artifacts: Vec<Artifact> = result
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Image { data, mime_type } => Some(Artifact::new(
                    format!("data:{};base64,{}", mime_type, data),
                    mime_type.clone(),
                )),
                _ => None,
            })
            .collect();

        artifacts.into_iter().fold(
            ToolResult::success(&call.id, &self.descriptor.name, self.render_text(&result)),
            ToolResult::with_artifact,
        )
    }

    fn render_text(&self, result: &CallToolResult) -> String {
        let text = result.text();
        match self.max_output_chars {
            Some(max) => limit_output(&text, max),
            None => text,
        }
    }
}

/// Cap the output at `max` characters.
///
/// Interpreter-style servers answer with a JSON object whose `output` array
/// holds the captured streams; each entry is capped on its own so the
/// object stays valid JSON.
fn limit_output(text: &str, max: usize) -> String {
    if let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(text)
        && let Some(Value::Array(outputs)) = object.get_mut("output")
    {
        for entry in outputs.iter_mut() {
            if let Value::String(s) = entry {
                *s = truncate_output(s, max);
            }
        }
        return Value::Object(object).to_string();
    }
    truncate_output(text, max)
}

/// Map a protocol failure onto the tool error taxonomy.
pub fn protocol_error(server: &str, error: ProtocolError) -> ToolError {
    match error {
        ProtocolError::ServerFailed(server) => ToolError::server_failed(server),
        ProtocolError::Rpc { code, message } if code == INVALID_PARAMS => {
            ToolError::invalid_argument(message)
        }
        ProtocolError::Transport(_)
        | ProtocolError::Handshake { .. }
        | ProtocolError::NotReady { .. }
        | ProtocolError::SessionExpired => {
            ToolError::connection(error.to_string()).with_details(format!("server: {}", server))
        }
        ProtocolError::Rpc { .. }
        | ProtocolError::InvalidResponse(_)
        | ProtocolError::Serialization(_) => ToolError::execution_failed(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ConnectionState, Transport, TransportReply};
    use async_trait::async_trait;
    use conductor_domain::ToolErrorKind;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Answers `tools/call` with a canned result, or fails the channel.
    struct CannedServer {
        call_result: Mutex<Value>,
        down: AtomicBool,
    }

    impl CannedServer {
        fn new(call_result: Value) -> Arc<Self> {
            Arc::new(Self {
                call_result: Mutex::new(call_result),
                down: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Transport for CannedServer {
        async fn send(
            &self,
            message: &Value,
            _session_id: Option<&str>,
        ) -> crate::protocol::error::Result<TransportReply> {
            if self.down.load(Ordering::SeqCst) {
                return Err(ProtocolError::Transport("connection refused".into()));
            }
            let Some(id) = message.get("id").cloned() else {
                return Ok(TransportReply::default());
            };
            let result = match message["method"].as_str() {
                Some("initialize") => json!({"protocolVersion": "2025-03-26", "capabilities": {}}),
                Some("tools/call") => self.call_result.lock().unwrap().clone(),
                _ => json!({}),
            };
            Ok(TransportReply {
                frames: vec![json!({"jsonrpc": "2.0", "id": id, "result": result})],
                session_id: None,
            })
        }
    }

    async fn tool_on(server: Arc<CannedServer>, max: Option<usize>) -> (RemoteTool, Arc<ProtocolClient>) {
        let client = Arc::new(ProtocolClient::new("py", server).with_max_consecutive_failures(1));
        client.connect().await.unwrap();
        let tool = RemoteTool::new(ToolDescriptor::new("execute_code", "Run code"), Arc::clone(&client))
            .with_max_output_chars(max);
        (tool, client)
    }

    fn code_call() -> ToolCall {
        ToolCall::new("call_1", "execute_code").with_arg("code", "print(2 + 2)")
    }

    #[tokio::test]
    async fn test_text_content_becomes_output() {
        let server = CannedServer::new(json!({"content": [{"type": "text", "text": "4"}]}));
        let (tool, _) = tool_on(server, None).await;

        let result = tool.execute(&code_call()).await;
        assert_eq!(result.output(), Some("4"));
    }

    #[tokio::test]
    async fn test_is_error_becomes_execution_failure() {
        let server = CannedServer::new(json!({
            "content": [{"type": "text", "text": "NameError: x"}],
            "isError": true
        }));
        let (tool, _) = tool_on(server, None).await;

        let result = tool.execute(&code_call()).await;
        let error = result.error().unwrap();
        assert_eq!(error.kind, ToolErrorKind::Execution);
        assert_eq!(error.message, "NameError: x");
    }

    #[tokio::test]
    async fn test_output_array_entries_are_truncated() {
        let payload = json!({"success": true, "output": ["a".repeat(50), "short"]}).to_string();
        let server = CannedServer::new(json!({"content": [{"type": "text", "text": payload}]}));
        let (tool, _) = tool_on(server, Some(10)).await;

        let result = tool.execute(&code_call()).await;
        let parsed: Value = serde_json::from_str(result.output().unwrap()).unwrap();
        assert!(parsed["output"][0].as_str().unwrap().starts_with("aaaaaaaaaa\n... [truncated 40 chars]"));
        assert_eq!(parsed["output"][1], "short");
        assert_eq!(parsed["success"], true);
    }

    #[tokio::test]
    async fn test_plain_text_is_truncated() {
        let server = CannedServer::new(json!({"content": [{"type": "text", "text": "x".repeat(30)}]}));
        let (tool, _) = tool_on(server, Some(10)).await;

        let result = tool.execute(&code_call()).await;
        assert_eq!(result.output(), Some("xxxxxxxxxx\n... [truncated 20 chars]"));
    }

    #[tokio::test]
    async fn test_image_blocks_become_artifacts() {
        let server = CannedServer::new(json!({"content": [
            {"type": "text", "text": "plot ready"},
            {"type": "image", "data": "iVBORw0KGgo=", "mimeType": "image/png"}
        ]}));
        let (tool, _) = tool_on(server, None).await;

        let result = tool.execute(&code_call()).await;
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(result.artifacts[0].url, "data:image/png;base64,iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn test_exhausted_server_is_server_failed() {
        let server = CannedServer::new(json!({"content": []}));
        let (tool, client) = tool_on(Arc::clone(&server), None).await;
        server.down.store(true, Ordering::SeqCst);

        let result = tool.execute(&code_call()).await;

        assert_eq!(client.state(), ConnectionState::Failed);
        assert_eq!(result.error().unwrap().kind, ToolErrorKind::ServerFailed);
        assert!(result.is_terminal());
    }

    #[test]
    fn test_protocol_error_mapping() {
        let invalid = protocol_error(
            "py",
            ProtocolError::Rpc {
                code: INVALID_PARAMS,
                message: "code is required".into(),
            },
        );
        assert_eq!(invalid.kind, ToolErrorKind::InvalidArgument);

        let other_rpc = protocol_error(
            "py",
            ProtocolError::Rpc {
                code: -32603,
                message: "internal".into(),
            },
        );
        assert_eq!(other_rpc.kind, ToolErrorKind::Execution);

        let transport = protocol_error("py", ProtocolError::Transport("reset".into()));
        assert_eq!(transport.kind, ToolErrorKind::Connection);
        assert_eq!(transport.details.as_deref(), Some("server: py"));
    }
}
