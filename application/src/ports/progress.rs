//! Progress notification port
//!
//! Defines the interface for reporting progress while the orchestrator runs.

use conductor_domain::{TerminationReason, ToolCall, ToolResult};

/// Callback for progress updates during a run
///
/// Implementations live in the presentation layer. Every method has a
/// no-op default so reporters only implement what they display.
pub trait OrchestratorProgress: Send + Sync {
    /// Called before each model round trip (1-based)
    fn on_round_start(&self, _round: usize, _max_depth: usize) {}

    /// Called when the model answered with `tool_calls` requested calls
    fn on_model_response(&self, _tool_calls: usize) {}

    /// Called when a tool call is handed to the dispatcher
    fn on_tool_dispatch(&self, _call: &ToolCall) {}

    /// Called once per call, in call order, after the whole batch resolved
    fn on_tool_result(&self, _call: &ToolCall, _result: &ToolResult) {}

    /// Called when the run stops
    fn on_terminated(&self, _reason: &TerminationReason) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl OrchestratorProgress for NoProgress {}
