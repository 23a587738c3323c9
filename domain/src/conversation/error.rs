//! Transcript violations

use thiserror::Error;

/// A message could not be appended without breaking the transcript discipline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("tool-result message carries no tool call id")]
    MissingToolCallId,

    #[error("tool result '{id}' does not follow an assistant message with tool calls")]
    NoPendingToolCalls { id: String },

    #[error("tool result '{id}' matches no call in the preceding assistant message")]
    UnmatchedToolResult { id: String },

    #[error("tool call '{id}' already has a result")]
    DuplicateToolResult { id: String },

    #[error("tool call id '{id}' appears more than once in one assistant message")]
    DuplicateToolCallId { id: String },

    #[error("tool calls still awaiting results: {}", ids.join(", "))]
    UnansweredToolCalls { ids: Vec<String> },
}
