//! file_content_extraction tool: read a document page by page, or query it
//! when it is too large to page through

use super::{LocalTool, document_error};
use async_trait::async_trait;
use conductor_application::ports::tool_executor::ToolContext;
use conductor_application::{DocumentAnswer, DocumentReader};
use conductor_domain::{ScoredChunk, ToolCall, ToolDescriptor, ToolError, ToolResult};
use serde_json::json;
use std::sync::Arc;

/// Tool name constant
pub const FILE_CONTENT_EXTRACTION: &str = "file_content_extraction";

/// Payload returned for documents without any text
pub const EMPTY_DOCUMENT_MESSAGE: &str = "Error: File content not found.";

pub struct FileContentTool {
    reader: Arc<DocumentReader>,
}

impl FileContentTool {
    pub fn new(reader: Arc<DocumentReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl LocalTool for FileContentTool {
    fn descriptor(&self) -> ToolDescriptor {
        let policy = self.reader.policy();
        let description = format!(
            "Extracts text content from files (TXT, CSV, HTML, Markdown). \
             PAGINATION: files of up to {threshold} characters are split into pages of \
             {page} characters; a trailer `**Page #X. Total pages: Y**` is appended when \
             more than one page exists. Start with page=1 and request the following pages \
             before answering questions about the whole file. \
             LARGE FILES: files over {threshold} characters cannot be paged; pass `query` \
             to get the most relevant excerpts instead.",
            threshold = policy.retrieval_threshold,
            page = policy.page_size,
        );

        ToolDescriptor::new(FILE_CONTENT_EXTRACTION, description).with_input_schema(json!({
            "type": "object",
            "properties": {
                "file_url": {
                    "type": "string",
                    "description": "File URL or path"
                },
                "page": {
                    "type": "integer",
                    "description": format!(
                        "Page to read. Each page holds {} characters.",
                        policy.page_size
                    ),
                    "minimum": 1,
                    "default": 1
                },
                "query": {
                    "type": "string",
                    "description": "What to look for. Required for files too large to page through."
                }
            },
            "required": ["file_url"]
        }))
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult {
        let file_url = match call.require_string("file_url") {
            Ok(url) => url,
            Err(e) => {
                return ToolResult::failure(&call.id, FILE_CONTENT_EXTRACTION, ToolError::invalid_argument(e));
            }
        };
        let page = call.get_i64("page").unwrap_or(1);
        if page < 1 {
            return ToolResult::failure(
                &call.id,
                FILE_CONTENT_EXTRACTION,
                ToolError::invalid_argument(format!("page must be 1 or greater, got {}", page)),
            );
        }
        let query = call.get_string("query");

        let answer = self
            .reader
            .read(&ctx.conversation_id, file_url, page as usize, query)
            .await;

        match answer {
            Ok(DocumentAnswer::Page { content, .. }) => {
                ToolResult::success(&call.id, FILE_CONTENT_EXTRACTION, content)
            }
            Ok(DocumentAnswer::Passages {
                chunks,
                indexed_chunks,
            }) => ToolResult::success(
                &call.id,
                FILE_CONTENT_EXTRACTION,
                render_passages(file_url, &chunks, indexed_chunks),
            ),
            Ok(DocumentAnswer::Empty) => {
                ToolResult::success(&call.id, FILE_CONTENT_EXTRACTION, EMPTY_DOCUMENT_MESSAGE)
            }
            Err(e) => ToolResult::failure(&call.id, FILE_CONTENT_EXTRACTION, document_error(e)),
        }
    }
}

fn render_passages(file_url: &str, chunks: &[ScoredChunk], indexed_chunks: usize) -> String {
    if chunks.is_empty() {
        return format!("No passages of {} matched the query.", file_url);
    }

    let mut out = format!(
        "The file is too large to read in full. {} most relevant of {} excerpts from {}:\n",
        chunks.len(),
        indexed_chunks,
        file_url
    );
    for (i, scored) in chunks.iter().enumerate() {
        out.push_str(&format!("\n[{}]\n{}\n", i + 1, scored.chunk.text));
    }
    out
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

    fn tool(page_size: usize, threshold: usize) -> FileContentTool {
        let extractor = Arc::new(TextExtractor::new(Duration::from_secs(5)).unwrap());
        let cache = Arc::new(RetrievalCache::new(
            Arc::new(HashingEmbedder::default()),
            Duration::from_secs(3600),
        ));
        let reader = DocumentReader::new(
            extractor,
            cache,
            ExtractionPolicy::new(page_size, threshold),
            TextSplitter::new(80, 10),
            2,
        );
        FileContentTool::new(Arc::new(reader))
    }

    fn ctx() -> ToolContext {
        ToolContext::new(ConversationId::new("conv-1"))
    }

    fn write_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", text).unwrap();
        file
    }

    fn call(file: &NamedTempFile) -> ToolCall {
        ToolCall::new("call_1", FILE_CONTENT_EXTRACTION)
            .with_arg("file_url", file.path().to_str().unwrap())
    }

    #[tokio::test]
    async fn test_small_file_single_page_has_no_trailer() {
        let file = write_file("Quarterly revenue grew by 4%.");
        let result = tool(100, 1000).execute(&ctx(), &call(&file)).await;

        assert!(result.is_success());
        assert_eq!(result.output(), Some("Quarterly revenue grew by 4%."));
    }

    #[tokio::test]
    async fn test_second_page_carries_trailer() {
        let file = write_file(&"x".repeat(250));
        let result = tool(100, 1000)
            .execute(&ctx(), &call(&file).with_arg("page", 2))
            .await;

        let output = result.output().unwrap();
        assert!(output.starts_with(&"x".repeat(100)));
        assert!(output.ends_with("**Page #2. Total pages: 3**"));
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_invalid_argument() {
        let file = write_file(&"x".repeat(250));
        let result = tool(100, 1000)
            .execute(&ctx(), &call(&file).with_arg("page", 4))
            .await;

        assert_eq!(result.error().unwrap().kind, ToolErrorKind::InvalidArgument);
        assert!(result.error().unwrap().message.contains("3 page(s)"));
    }

    #[tokio::test]
    async fn test_zero_page_is_invalid_argument() {
        let file = write_file("abc");
        let result = tool(100, 1000)
            .execute(&ctx(), &call(&file).with_arg("page", 0))
            .await;

        assert_eq!(result.error().unwrap().kind, ToolErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_empty_file_yields_not_found_text() {
        let file = write_file("");
        let result = tool(100, 1000).execute(&ctx(), &call(&file)).await;

        assert!(result.is_success());
        assert_eq!(result.output(), Some(EMPTY_DOCUMENT_MESSAGE));
    }

    #[tokio::test]
    async fn test_large_file_without_query_asks_for_one() {
        let file = write_file(&"lorem ipsum dolor ".repeat(20));
        let result = tool(100, 200).execute(&ctx(), &call(&file)).await;

        assert_eq!(result.error().unwrap().kind, ToolErrorKind::InvalidArgument);
        assert!(result.error().unwrap().message.contains("query"));
    }

    #[tokio::test]
    async fn test_large_file_with_query_returns_excerpts() {
        let text = format!(
            "{}\n\nThe warranty covers manufacturing defects for two years.\n\n{}",
            "Setup instructions follow in detail. ".repeat(6),
            "Cleaning the device requires a dry cloth. ".repeat(6)
        );
        let file = write_file(&text);
        let result = tool(100, 200)
            .execute(&ctx(), &call(&file).with_arg("query", "warranty defects"))
            .await;

        let output = result.output().unwrap();
        assert!(output.contains("most relevant"));
        assert!(output.contains("[1]\nThe warranty covers manufacturing defects"));
    }

    #[tokio::test]
    async fn test_missing_file_is_invalid_argument() {
        let call = ToolCall::new("call_1", FILE_CONTENT_EXTRACTION)
            .with_arg("file_url", "/no/such/file.txt");
        let result = tool(100, 1000).execute(&ctx(), &call).await;

        assert_eq!(result.error().unwrap().kind, ToolErrorKind::InvalidArgument);
    }

    #[test]
    fn test_descriptor_schema() {
        let schema = tool(10_000, 20_000).descriptor().parameter_schema();
        assert_eq!(schema["required"], json!(["file_url"]));
        assert_eq!(schema["properties"]["page"]["minimum"], 1);
    }
}
