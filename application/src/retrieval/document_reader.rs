//! Hybrid document reading
//!
//! Decides per document whether to page through it or to answer from the
//! retrieval cache, following the [`ExtractionPolicy`]:
//!
//! - at or under the threshold, the requested page is returned as text with
//!   a page trailer;
//! - over the threshold, the whole document is indexed once per
//!   conversation and the query is answered with the best-matching chunks.

use super::cache::RetrievalCache;
use crate::ports::embedding::EmbeddingError;
use crate::ports::file_extractor::{ExtractionError, FileExtractorPort};
use conductor_domain::{
    Chunk, ConversationId, ExtractedPage, ExtractionPolicy, ExtractionRoute, ScoredChunk,
    TextSplitter,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DocumentReadError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Page number must be 1 or greater")]
    InvalidPage,

    #[error("Page {page} does not exist; the document has {total_pages} page(s)")]
    PageOutOfRange { page: usize, total_pages: usize },

    #[error(
        "The document has {total_chars} characters, too many to read page by page; \
         call again with a `query` describing what to look for"
    )]
    QueryRequired { total_chars: usize },
}

/// What a read produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentAnswer {
    Page {
        content: String,
        page: usize,
        total_pages: usize,
        has_more: bool,
    },
    Passages {
        chunks: Vec<ScoredChunk>,
        indexed_chunks: usize,
    },
    /// The document has no text
    Empty,
}

pub struct DocumentReader {
    extractor: Arc<dyn FileExtractorPort>,
    cache: Arc<RetrievalCache>,
    policy: ExtractionPolicy,
    splitter: TextSplitter,
    top_k: usize,
}

impl DocumentReader {
    pub fn new(
        extractor: Arc<dyn FileExtractorPort>,
        cache: Arc<RetrievalCache>,
        policy: ExtractionPolicy,
        splitter: TextSplitter,
        top_k: usize,
    ) -> Self {
        Self {
            extractor,
            cache,
            policy,
            splitter,
            top_k: top_k.max(1),
        }
    }

    pub fn policy(&self) -> &ExtractionPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &Arc<RetrievalCache> {
        &self.cache
    }

    /// Serve `document_ref` according to the extraction policy.
    pub async fn read(
        &self,
        conversation_id: &ConversationId,
        document_ref: &str,
        page: usize,
        query: Option<&str>,
    ) -> Result<DocumentAnswer, DocumentReadError> {
        if page == 0 {
            return Err(DocumentReadError::InvalidPage);
        }

        let first = self
            .extractor
            .extract(document_ref, 0, self.policy.page_size)
            .await?;
        if first.total_chars == 0 {
            return Ok(DocumentAnswer::Empty);
        }

        match self.policy.route(first.total_chars) {
            ExtractionRoute::Paginate => self.page(document_ref, first, page).await,
            ExtractionRoute::Retrieve => {
                let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
                    return Err(DocumentReadError::QueryRequired {
                        total_chars: first.total_chars,
                    });
                };

                let indexed_chunks = self.index(conversation_id, document_ref, first).await?;
                let chunks = self
                    .cache
                    .search_source(conversation_id, document_ref, query, self.top_k)
                    .await?;
                Ok(DocumentAnswer::Passages {
                    chunks,
                    indexed_chunks,
                })
            }
        }
    }

    /// Always answer through retrieval, whatever the document size.
    pub async fn search(
        &self,
        conversation_id: &ConversationId,
        document_ref: &str,
        query: &str,
    ) -> Result<Vec<ScoredChunk>, DocumentReadError> {
        let mut indexed = self.cache.source_len(conversation_id, document_ref).await;
        if indexed == 0 {
            let first = self
                .extractor
                .extract(document_ref, 0, self.policy.page_size)
                .await?;
            if first.total_chars == 0 {
                return Ok(Vec::new());
            }
            indexed = self.index(conversation_id, document_ref, first).await?;
        }

        let k = self.top_k.min(indexed);
        Ok(self
            .cache
            .search_source(conversation_id, document_ref, query, k)
            .await?)
    }

    async fn page(
        &self,
        document_ref: &str,
        first: ExtractedPage,
        page: usize,
    ) -> Result<DocumentAnswer, DocumentReadError> {
        let total_pages = self.policy.total_pages(first.total_chars);
        if page > total_pages {
            return Err(DocumentReadError::PageOutOfRange { page, total_pages });
        }

        let slice = if page == 1 {
            first
        } else {
            self.extractor
                .extract(
                    document_ref,
                    self.policy.cursor_for_page(page),
                    self.policy.page_size,
                )
                .await?
        };

        Ok(DocumentAnswer::Page {
            content: self.policy.render_page(&slice, page),
            page,
            total_pages,
            has_more: slice.has_more(),
        })
    }

    /// Index the document once per conversation. Returns the number of
    /// chunks stored for it.
    async fn index(
        &self,
        conversation_id: &ConversationId,
        document_ref: &str,
        first: ExtractedPage,
    ) -> Result<usize, DocumentReadError> {
        let existing = self.cache.source_len(conversation_id, document_ref).await;
        if existing > 0 {
            return Ok(existing);
        }

        let text = self.read_all(document_ref, first).await?;
        let chunks: Vec<Chunk> = self
            .splitter
            .split(&text)
            .into_iter()
            .map(|t| Chunk::new(document_ref, t))
            .collect();

        debug!(
            conversation = %conversation_id,
            document = document_ref,
            chunks = chunks.len(),
            "Indexing document"
        );
        self.cache.add_documents(conversation_id, chunks).await?;
        Ok(self.cache.source_len(conversation_id, document_ref).await)
    }

    async fn read_all(
        &self,
        document_ref: &str,
        first: ExtractedPage,
    ) -> Result<String, DocumentReadError> {
        let mut text = first.slice;
        let mut cursor = first.next_cursor;

        while let Some(current) = cursor {
            let page = self
                .extractor
                .extract(document_ref, current, self.policy.page_size)
                .await?;
            text.push_str(&page.slice);
            cursor = page.next_cursor.filter(|next| *next > current);
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::embedding::EmbeddingPort;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MemoryExtractor {
        documents: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl MemoryExtractor {
        fn new(documents: &[(&str, String)]) -> Self {
            Self {
                documents: documents
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileExtractorPort for MemoryExtractor {
        async fn extract(
            &self,
            document_ref: &str,
            cursor: usize,
            page_size: usize,
        ) -> Result<ExtractedPage, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = self
                .documents
                .get(document_ref)
                .ok_or_else(|| ExtractionError::NotFound(document_ref.to_string()))?;
            Ok(ExtractedPage::from_text(text, cursor, page_size))
        }
    }

    struct TopicEmbedder;

    #[async_trait]
    impl EmbeddingPort for TopicEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    vec![
                        t.matches("warranty").count() as f32 + 0.01,
                        t.matches("battery").count() as f32 + 0.01,
                    ]
                })
                .collect())
        }
    }

    fn manual() -> String {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!("Section {} covers battery care and charging.\n\n", i));
        }
        text.push_str("The warranty lasts two years from the date of purchase.\n\n");
        text
    }

    fn reader(extractor: Arc<MemoryExtractor>) -> DocumentReader {
        let cache = Arc::new(RetrievalCache::new(
            Arc::new(TopicEmbedder),
            Duration::from_secs(60),
        ));
        DocumentReader::new(
            extractor,
            cache,
            ExtractionPolicy::new(100, 500),
            TextSplitter::new(120, 10),
            3,
        )
    }

    fn conv() -> ConversationId {
        ConversationId::new("conv")
    }

    #[tokio::test]
    async fn test_small_document_is_paginated() {
        let text = "a".repeat(250);
        let extractor = Arc::new(MemoryExtractor::new(&[("small.txt", text)]));
        let reader = reader(extractor);

        let answer = reader.read(&conv(), "small.txt", 2, None).await.unwrap();
        match answer {
            DocumentAnswer::Page {
                content,
                page,
                total_pages,
                has_more,
            } => {
                assert_eq!(page, 2);
                assert_eq!(total_pages, 3);
                assert!(has_more);
                assert!(content.ends_with("**Page #2. Total pages: 3**"));
            }
            other => panic!("expected page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_page_out_of_range() {
        let extractor = Arc::new(MemoryExtractor::new(&[("small.txt", "abc".to_string())]));
        let err = reader(extractor)
            .read(&conv(), "small.txt", 2, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentReadError::PageOutOfRange {
                page: 2,
                total_pages: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_document() {
        let extractor = Arc::new(MemoryExtractor::new(&[("empty.txt", String::new())]));
        let answer = reader(extractor).read(&conv(), "empty.txt", 1, None).await.unwrap();
        assert_eq!(answer, DocumentAnswer::Empty);
    }

    #[tokio::test]
    async fn test_large_document_requires_query() {
        let extractor = Arc::new(MemoryExtractor::new(&[("manual.txt", manual())]));
        let err = reader(extractor)
            .read(&conv(), "manual.txt", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentReadError::QueryRequired { .. }));
    }

    #[tokio::test]
    async fn test_large_document_routes_to_retrieval() {
        let extractor = Arc::new(MemoryExtractor::new(&[("manual.txt", manual())]));
        let reader = reader(Arc::clone(&extractor));

        let answer = reader
            .read(&conv(), "manual.txt", 1, Some("how long is the warranty"))
            .await
            .unwrap();
        let DocumentAnswer::Passages {
            chunks,
            indexed_chunks,
        } = answer
        else {
            panic!("expected passages");
        };
        assert!(indexed_chunks > 3);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].chunk.text.contains("warranty"));
    }

    #[tokio::test]
    async fn test_document_is_indexed_once() {
        let extractor = Arc::new(MemoryExtractor::new(&[("manual.txt", manual())]));
        let reader = reader(Arc::clone(&extractor));

        reader.search(&conv(), "manual.txt", "warranty").await.unwrap();
        let count = reader.cache().chunk_count(&conv()).await;
        let calls = extractor.calls.load(Ordering::SeqCst);

        reader.search(&conv(), "manual.txt", "battery").await.unwrap();
        reader
            .read(&conv(), "manual.txt", 1, Some("warranty"))
            .await
            .unwrap();

        assert_eq!(reader.cache().chunk_count(&conv()).await, count);
        // The second search is served from the cache without extraction.
        assert_eq!(extractor.calls.load(Ordering::SeqCst), calls + 1);
    }

    #[tokio::test]
    async fn test_search_k_bounded_by_chunk_count() {
        let extractor = Arc::new(MemoryExtractor::new(&[(
            "note.txt",
            "warranty is void if opened".to_string(),
        )]));
        let hits = reader(extractor)
            .search(&conv(), "note.txt", "warranty")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_document_is_an_error() {
        let extractor = Arc::new(MemoryExtractor::new(&[]));
        let err = reader(extractor)
            .read(&conv(), "missing.txt", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentReadError::Extraction(ExtractionError::NotFound(_))
        ));
    }
}
