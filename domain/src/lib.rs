//! Domain layer for conductor
//!
//! This crate contains the core vocabulary of the agent orchestrator:
//! conversations, tool contracts and results, retrieval chunks, the
//! hybrid extraction policy and the orchestration state machine.
//! It has no dependencies on infrastructure or presentation concerns.

pub mod config;
pub mod conversation;
pub mod core;
pub mod extraction;
pub mod orchestration;
pub mod prompt;
pub mod retrieval;
pub mod tool;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use conversation::{Conversation, ConversationError, ConversationId, Message, Role};
pub use core::error::DomainError;
pub use extraction::{ExtractedPage, ExtractionPolicy, ExtractionRoute};
pub use orchestration::{OrchestrationPhase, OrchestrationState, Step, TerminationReason};
pub use retrieval::{Chunk, RetrievalIndex, ScoredChunk, TextSplitter};
pub use tool::{
    Artifact, SchemaToolValidator, ToolCall, ToolDescriptor, ToolError, ToolErrorKind,
    ToolParameter, ToolResult, ToolValidator,
};
