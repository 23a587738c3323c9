//! Infrastructure layer for conductor
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the model gateway, the remote tool protocol
//! client, the tool registry, document extraction, embeddings, conversation
//! logging and configuration file loading.

pub mod config;
pub mod extraction;
pub mod logging;
pub mod model;
pub mod protocol;
pub mod retrieval;
pub mod tools;

// Re-export commonly used types
pub use config::{ConfigLoader, EmbeddingKind, FileConfig, FileOutputConfig};
pub use extraction::TextExtractor;
pub use logging::JsonlConversationLogger;
pub use model::HttpModelGateway;
pub use protocol::{ConnectionState, HttpTransport, ProtocolClient, ProtocolError};
pub use retrieval::{HashingEmbedder, HttpEmbeddingClient};
pub use tools::{
    DeploymentTool, DocumentSearchTool, FileContentTool, HttpDeploymentClient, LocalTool,
    RegistryStats, RemoteTool, ToolAdapter, ToolRegistry,
};
