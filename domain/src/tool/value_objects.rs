//! Tool domain value objects: immutable result and error types
//!
//! Every dispatched [`ToolCall`](super::entities::ToolCall) produces exactly
//! one [`ToolResult`]. Failures are values, not faults: a failed result is
//! rendered into the transcript like any other, so the model can react to it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure category of a tool execution.
///
/// | Kind | Code | Terminal for the turn? |
/// |------|------|:---:|
/// | `Connection` | `CONNECTION_ERROR` | No |
/// | `NotFound` | `NOT_FOUND` | No |
/// | `InvalidArgument` | `INVALID_ARGUMENT` | No |
/// | `Timeout` | `TIMEOUT` | No |
/// | `Execution` | `EXECUTION_FAILED` | No |
/// | `ServerFailed` | `SERVER_FAILED` | Yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorKind {
    /// Remote server unreachable or handshake failed
    Connection,
    /// Tool name is not registered
    NotFound,
    /// Arguments do not satisfy the parameter contract
    InvalidArgument,
    /// Per-call deadline exceeded
    Timeout,
    /// Adapter-internal failure
    Execution,
    /// The owning remote server exhausted its reconnect budget
    ServerFailed,
}

impl ToolErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ToolErrorKind::Connection => "CONNECTION_ERROR",
            ToolErrorKind::NotFound => "NOT_FOUND",
            ToolErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ToolErrorKind::Timeout => "TIMEOUT",
            ToolErrorKind::Execution => "EXECUTION_FAILED",
            ToolErrorKind::ServerFailed => "SERVER_FAILED",
        }
    }

    /// Whether a failure of this kind ends the current turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolErrorKind::ServerFailed)
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error that occurred during tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Connection, message)
    }

    pub fn not_found(tool_name: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::NotFound,
            format!("Tool not found: {}", tool_name.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArgument, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            format!("Operation timed out: {}", operation.into()),
        )
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution, message)
    }

    pub fn server_failed(server: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::ServerFailed,
            format!("Tool server '{}' is unavailable", server.into()),
        )
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Reference to a secondary artifact produced by a tool (e.g. a generated image).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub url: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Artifact {
    pub fn new(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: mime_type.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Markdown rendering used in tool-result text.
    pub fn to_markdown(&self) -> String {
        if self.is_image() {
            format!("![image]({})", self.url)
        } else {
            let label = self.title.as_deref().unwrap_or(&self.url);
            format!("[{}]({})", label, self.url)
        }
    }
}

/// Result of a tool execution, carrying output or error information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the call this result answers
    pub tool_call_id: String,
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Text output (for successful execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Structured output (for successful execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
    /// Artifacts referenced by the output
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    /// Error information (for failed execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Duration of execution in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    /// Create a successful text result
    pub fn success(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            success: true,
            output: Some(output.into()),
            structured: None,
            artifacts: Vec::new(),
            error: None,
            duration_ms: None,
        }
    }

    /// Create a successful structured result
    pub fn structured(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            success: true,
            output: None,
            structured: Some(value),
            artifacts: Vec::new(),
            error: None,
            duration_ms: None,
        }
    }

    /// Create a failed result
    pub fn failure(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: ToolError,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            success: false,
            output: None,
            structured: None,
            artifacts: Vec::new(),
            error: Some(error),
            duration_ms: None,
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Whether this result ends the current turn.
    pub fn is_terminal(&self) -> bool {
        self.error.as_ref().is_some_and(|e| e.kind.is_terminal())
    }

    /// Text placed in the tool-result message the model reads next round.
    pub fn to_message_content(&self) -> String {
        if let Some(error) = &self.error {
            return format!("Error: {}", error);
        }

        let mut parts = Vec::new();
        if let Some(output) = &self.output
            && !output.is_empty()
        {
            parts.push(output.clone());
        }
        if let Some(value) = &self.structured {
            parts.push(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
        }
        for artifact in &self.artifacts {
            parts.push(artifact.to_markdown());
        }
        parts.join("\n\n")
    }
}
