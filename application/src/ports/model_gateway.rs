//! Model Gateway port
//!
//! Defines the interface for one model round trip: the conversation so far
//! plus the available tools go in, either text or a batch of tool calls
//! comes out.

use async_trait::async_trait;
use conductor_domain::{Message, ToolCall, ToolDescriptor};
use thiserror::Error;

/// Errors that can occur during model gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Input of one model call
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Ordered transcript, system prompt included
    pub messages: Vec<Message>,
    /// Tools the model may call
    pub tools: Vec<ToolDescriptor>,
}

impl ModelRequest {
    pub fn new(messages: Vec<Message>, tools: Vec<ToolDescriptor>) -> Self {
        Self { messages, tools }
    }
}

/// Output of one model call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn from_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Gateway for model communication
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, GatewayError>;

    /// Name of the model or deployment behind this gateway
    fn model_name(&self) -> &str {
        "unknown"
    }
}
