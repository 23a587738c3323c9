//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod conversation_logger;
pub mod deployment;
pub mod embedding;
pub mod file_extractor;
pub mod model_gateway;
pub mod progress;
pub mod tool_executor;
