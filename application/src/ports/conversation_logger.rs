//! Port for structured conversation logging.
//!
//! Separate from `tracing`: tracing carries human-readable diagnostics,
//! while this port records each run as machine-readable events.

use serde_json::Value;

/// Event types emitted by the orchestrator, one per step of a run.
pub mod event_type {
    pub const MODEL_REQUEST: &str = "model_request";
    pub const MODEL_RESPONSE: &str = "model_response";
    pub const TOOL_CALL: &str = "tool_call";
    pub const TOOL_RESULT: &str = "tool_result";
    pub const RUN_TERMINATED: &str = "run_terminated";
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationEvent {
    /// One of the [`event_type`] constants
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Sink for conversation events. Logging never fails a run.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// Used when no conversation log is configured.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
