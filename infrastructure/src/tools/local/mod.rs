//! In-process tools
//!
//! - `file_content_extraction`: pages through small documents and answers
//!   large ones from the retrieval cache
//! - `document_search`: retrieval-only lookup over one document

pub mod document_search;
pub mod file_content;

pub use document_search::DocumentSearchTool;
pub use file_content::FileContentTool;

use async_trait::async_trait;
use conductor_application::ports::tool_executor::ToolContext;
use conductor_application::DocumentReadError;
use conductor_application::ExtractionError;
use conductor_domain::{ToolCall, ToolDescriptor, ToolError, ToolResult};

/// A tool that runs inside the orchestrator process.
#[async_trait]
pub trait LocalTool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult;
}

/// Map a document read failure onto the tool error taxonomy.
pub(crate) fn document_error(error: DocumentReadError) -> ToolError {
    match error {
        DocumentReadError::InvalidPage
        | DocumentReadError::PageOutOfRange { .. }
        | DocumentReadError::QueryRequired { .. } => ToolError::invalid_argument(error.to_string()),
        DocumentReadError::Extraction(
            ExtractionError::NotFound(_) | ExtractionError::Unsupported(_),
        ) => ToolError::invalid_argument(error.to_string()),
        DocumentReadError::Extraction(ExtractionError::ReadFailed { .. }) => {
            ToolError::execution_failed(error.to_string())
        }
        DocumentReadError::Embedding(e) => {
            ToolError::execution_failed(format!("Failed to index document: {}", e))
        }
    }
}
