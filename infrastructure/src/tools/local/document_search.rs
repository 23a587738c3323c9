//! document_search tool: retrieval-augmented lookup over one document

use super::{LocalTool, document_error};
use async_trait::async_trait;
use conductor_application::DocumentReader;
use conductor_application::ports::tool_executor::ToolContext;
use conductor_domain::{ScoredChunk, ToolCall, ToolDescriptor, ToolError, ToolParameter, ToolResult};
use std::sync::Arc;

/// Tool name constant
pub const DOCUMENT_SEARCH: &str = "document_search";

pub struct DocumentSearchTool {
    reader: Arc<DocumentReader>,
}

impl DocumentSearchTool {
    pub fn new(reader: Arc<DocumentReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl LocalTool for DocumentSearchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            DOCUMENT_SEARCH,
            "Performs semantic search over a document and returns the most relevant \
             excerpts together with the request. Use it for questions about specific \
             facts in a file; do not use it to read a file from start to end. \
             The document is indexed once per conversation.",
        )
        .with_parameter(ToolParameter::new(
            "request",
            "The search query or question to search for in the document",
            true,
        ))
        .with_parameter(ToolParameter::new("file_url", "File URL or path", true))
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult {
        let (request, file_url) =
            match (call.require_string("request"), call.require_string("file_url")) {
                (Ok(request), Ok(file_url)) => (request, file_url),
                (Err(e), _) | (_, Err(e)) => {
                    return ToolResult::failure(&call.id, DOCUMENT_SEARCH, ToolError::invalid_argument(e));
                }
            };

        match self
            .reader
            .search(&ctx.conversation_id, file_url, request)
            .await
        {
            Ok(chunks) if chunks.is_empty() => ToolResult::success(
                &call.id,
                DOCUMENT_SEARCH,
                super::file_content::EMPTY_DOCUMENT_MESSAGE,
            ),
            Ok(chunks) => ToolResult::success(&call.id, DOCUMENT_SEARCH, augment(request, &chunks)),
            Err(e) => ToolResult::failure(&call.id, DOCUMENT_SEARCH, document_error(e)),
        }
    }
}

/// Combine retrieved chunks with the request.
fn augment(request: &str, chunks: &[ScoredChunk]) -> String {
    let context = chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("CONTEXT:\n{}\n---\nREQUEST: {}", context, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::TextExtractor;
    use crate::retrieval::HashingEmbedder;
    use conductor_application::RetrievalCache;
    use conductor_domain::{ConversationId, ExtractionPolicy, TextSplitter, ToolErrorKind};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn setup() -> (DocumentSearchTool, Arc<RetrievalCache>) {
        let cache = Arc::new(RetrievalCache::new(
            Arc::new(HashingEmbedder::default()),
            Duration::from_secs(3600),
        ));
        let reader = DocumentReader::new(
            Arc::new(TextExtractor::new(Duration::from_secs(5)).unwrap()),
            Arc::clone(&cache),
            ExtractionPolicy::default(),
            TextSplitter::new(40, 0),
            3,
        );
        (DocumentSearchTool::new(Arc::new(reader)), cache)
    }

    fn manual() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "The battery lasts ten hours.\n\nThe warranty period is two years.\n\nThe case is aluminium."
        )
        .unwrap();
        file
    }

    fn search_call(file: &NamedTempFile, request: &str) -> ToolCall {
        ToolCall::new("call_1", DOCUMENT_SEARCH)
            .with_arg("request", request)
            .with_arg("file_url", file.path().to_str().unwrap())
    }

    #[tokio::test]
    async fn test_output_is_augmented_prompt() {
        let (tool, _) = setup();
        let file = manual();
        let ctx = ToolContext::new(ConversationId::new("c1"));

        let result = tool.execute(&ctx, &search_call(&file, "warranty period")).await;

        let output = result.output().unwrap();
        assert!(output.starts_with("CONTEXT:\nThe warranty period is two years."));
        assert!(output.ends_with("\n---\nREQUEST: warranty period"));
        // k = min(top_k, chunk count)
        assert_eq!(output.matches("The ").count(), 3);
    }

    #[tokio::test]
    async fn test_repeated_search_indexes_once() {
        let (tool, cache) = setup();
        let file = manual();
        let ctx = ToolContext::new(ConversationId::new("c1"));

        tool.execute(&ctx, &search_call(&file, "battery")).await;
        let after_first = cache.chunk_count(&ctx.conversation_id).await;
        tool.execute(&ctx, &search_call(&file, "case")).await;

        assert_eq!(after_first, 3);
        assert_eq!(cache.chunk_count(&ctx.conversation_id).await, 3);
    }

    #[tokio::test]
    async fn test_conversations_do_not_share_indexes() {
        let (tool, cache) = setup();
        let file = manual();
        let first = ToolContext::new(ConversationId::new("c1"));
        let second = ToolContext::new(ConversationId::new("c2"));

        tool.execute(&first, &search_call(&file, "battery")).await;

        assert_eq!(cache.chunk_count(&first.conversation_id).await, 3);
        assert_eq!(cache.chunk_count(&second.conversation_id).await, 0);
    }

    #[tokio::test]
    async fn test_missing_request_is_invalid_argument() {
        let (tool, _) = setup();
        let call = ToolCall::new("call_1", DOCUMENT_SEARCH).with_arg("file_url", "a.txt");
        let result = tool
            .execute(&ToolContext::new(ConversationId::new("c1")), &call)
            .await;

        assert_eq!(result.error().unwrap().kind, ToolErrorKind::InvalidArgument);
        assert!(result.error().unwrap().message.contains("request"));
    }
}
