//! Application layer for conductor
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod retrieval;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ExecutionParams, RetrievalParams};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    deployment::{DeploymentError, DeploymentPort, DeploymentRequest, DeploymentResponse},
    embedding::{EmbeddingError, EmbeddingPort},
    file_extractor::{ExtractionError, FileExtractorPort},
    model_gateway::{GatewayError, ModelGateway, ModelRequest, ModelResponse},
    progress::{NoProgress, OrchestratorProgress},
    tool_executor::{ToolContext, ToolExecutorPort},
};
pub use retrieval::{DocumentAnswer, DocumentReadError, DocumentReader, RetrievalCache};
pub use use_cases::dispatch::ToolDispatcher;
pub use use_cases::run_orchestrator::{
    AgentContext, Orchestrator, OrchestratorError, RunOutcome,
};
