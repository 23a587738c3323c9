//! Per-conversation retrieval cache
//!
//! Holds one [`RetrievalIndex`] per conversation. Indexes are created on the
//! first `add_documents` for a conversation, queried any number of times,
//! and dropped on [`close`](RetrievalCache::close) or after sitting idle
//! longer than the configured TTL.
//!
//! # Concurrency
//!
//! The conversation map sits behind a short, synchronous lock that is never
//! held across an await, which makes get-or-create atomic. Each index has
//! its own async lock, held while new chunks are embedded and inserted, so
//! concurrent adds for the same conversation are serialized and never
//! lose each other's chunks.

use crate::ports::embedding::{EmbeddingError, EmbeddingPort};
use conductor_domain::{Chunk, ConversationId, RetrievalIndex, ScoredChunk};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct Slot {
    index: tokio::sync::Mutex<RetrievalIndex>,
    last_access: Mutex<Instant>,
}

impl Slot {
    fn new(conversation_id: ConversationId) -> Self {
        Self {
            index: tokio::sync::Mutex::new(RetrievalIndex::new(conversation_id)),
            last_access: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        if let Ok(mut last) = self.last_access.lock() {
            *last = Instant::now();
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        self.last_access
            .lock()
            .map(|last| now.saturating_duration_since(*last))
            .unwrap_or_default()
    }
}

pub struct RetrievalCache {
    embedder: Arc<dyn EmbeddingPort>,
    slots: Mutex<HashMap<ConversationId, Arc<Slot>>>,
    idle_ttl: Duration,
}

impl RetrievalCache {
    pub fn new(embedder: Arc<dyn EmbeddingPort>, idle_ttl: Duration) -> Self {
        Self {
            embedder,
            slots: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    fn get_or_create(&self, conversation_id: &ConversationId) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let slot = slots
            .entry(conversation_id.clone())
            .or_insert_with(|| {
                debug!(conversation = %conversation_id, "Creating retrieval index");
                Arc::new(Slot::new(conversation_id.clone()))
            })
            .clone();
        slot.touch();
        slot
    }

    fn get(&self, conversation_id: &ConversationId) -> Option<Arc<Slot>> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let slot = slots.get(conversation_id).cloned()?;
        slot.touch();
        Some(slot)
    }

    /// Embed and append the chunks not yet present in the conversation's
    /// index. Returns how many were added; repeated calls with the same
    /// chunks add nothing.
    pub async fn add_documents(
        &self,
        conversation_id: &ConversationId,
        chunks: Vec<Chunk>,
    ) -> Result<usize, EmbeddingError> {
        let slot = self.get_or_create(conversation_id);
        let mut index = slot.index.lock().await;

        let mut fresh: Vec<Chunk> = Vec::new();
        for chunk in chunks {
            if !index.contains(&chunk) && !fresh.contains(&chunk) {
                fresh.push(chunk);
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = fresh.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != fresh.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: fresh.len(),
                actual: embeddings.len(),
            });
        }

        let mut added = 0;
        for (chunk, embedding) in fresh.into_iter().zip(embeddings) {
            if index.insert(chunk, embedding) {
                added += 1;
            }
        }

        slot.touch();
        debug!(
            conversation = %conversation_id,
            added,
            total = index.len(),
            "Indexed document chunks"
        );
        Ok(added)
    }

    /// Top-`k` chunks for `query` within one conversation. Unknown
    /// conversations yield an empty result.
    pub async fn search(
        &self,
        conversation_id: &ConversationId,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, EmbeddingError> {
        self.search_inner(conversation_id, query, k, None).await
    }

    /// Like [`search`](Self::search), restricted to chunks of one document.
    pub async fn search_source(
        &self,
        conversation_id: &ConversationId,
        source: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, EmbeddingError> {
        self.search_inner(conversation_id, query, k, Some(source)).await
    }

    async fn search_inner(
        &self,
        conversation_id: &ConversationId,
        query: &str,
        k: usize,
        source: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, EmbeddingError> {
        let Some(slot) = self.get(conversation_id) else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let index = slot.index.lock().await;
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })?;

        Ok(match source {
            Some(source) => index.search_source(&query_embedding, k, source),
            None => index.search(&query_embedding, k),
        })
    }

    /// Number of chunks stored for `source` in the conversation's index.
    pub async fn source_len(&self, conversation_id: &ConversationId, source: &str) -> usize {
        match self.get(conversation_id) {
            Some(slot) => slot.index.lock().await.source_len(source),
            None => 0,
        }
    }

    /// Total chunks in the conversation's index.
    pub async fn chunk_count(&self, conversation_id: &ConversationId) -> usize {
        match self.get(conversation_id) {
            Some(slot) => slot.index.lock().await.len(),
            None => 0,
        }
    }

    /// Drop the conversation's index. Returns whether one existed.
    pub fn close(&self, conversation_id: &ConversationId) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let removed = slots.remove(conversation_id).is_some();
        if removed {
            debug!(conversation = %conversation_id, "Closed retrieval index");
        }
        removed
    }

    /// Drop indexes idle for longer than the TTL. Indexes currently in use
    /// by an add or search are kept. Returns how many were evicted.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let before = slots.len();

        slots.retain(|id, slot| {
            let in_use = Arc::strong_count(slot) > 1;
            let keep = in_use || slot.idle_for(now) < self.idle_ttl;
            if !keep {
                debug!(conversation = %id, "Evicting idle retrieval index");
            }
            keep
        });

        before - slots.len()
    }

    /// Number of live conversation indexes.
    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run [`evict_idle`](Self::evict_idle) every `interval` until `cancel` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = cache.evict_idle();
                        if evicted > 0 {
                            info!(evicted, "Evicted idle retrieval indexes");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text by counting a few marker words.
    struct KeywordEmbedder {
        calls: AtomicUsize,
    }

    impl KeywordEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingPort for KeywordEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        t.matches("rust").count() as f32,
                        t.matches("python").count() as f32,
                        t.matches("go").count() as f32 + 0.01,
                    ]
                })
                .collect())
        }
    }

    fn cache() -> RetrievalCache {
        RetrievalCache::new(Arc::new(KeywordEmbedder::new()), Duration::from_secs(60))
    }

    fn conv(id: &str) -> ConversationId {
        ConversationId::new(id)
    }

    #[tokio::test]
    async fn test_search_unknown_conversation_is_empty() {
        let cache = cache();
        let hits = cache.search(&conv("nope"), "rust", 3).await.unwrap();
        assert!(hits.is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let cache = cache();
        let chunks = vec![
            Chunk::new("doc", "rust rust ownership"),
            Chunk::new("doc", "python decorators"),
        ];
        assert_eq!(cache.add_documents(&conv("a"), chunks).await.unwrap(), 2);

        let hits = cache.search(&conv("a"), "rust", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "rust rust ownership");
    }

    #[tokio::test]
    async fn test_re_adding_is_idempotent() {
        let cache = cache();
        let chunks = vec![Chunk::new("doc", "rust"), Chunk::new("doc", "python")];

        for _ in 0..5 {
            cache.add_documents(&conv("a"), chunks.clone()).await.unwrap();
        }
        assert_eq!(cache.chunk_count(&conv("a")).await, 2);
    }

    #[tokio::test]
    async fn test_duplicates_within_one_batch_are_collapsed() {
        let cache = cache();
        let chunks = vec![Chunk::new("doc", "rust"), Chunk::new("doc", "rust")];
        assert_eq!(cache.add_documents(&conv("a"), chunks).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let cache = cache();
        cache
            .add_documents(&conv("a"), vec![Chunk::new("doc-a", "rust secrets of A")])
            .await
            .unwrap();
        cache
            .add_documents(&conv("b"), vec![Chunk::new("doc-b", "python notes of B")])
            .await
            .unwrap();

        let hits = cache.search(&conv("a"), "python", 10).await.unwrap();
        assert!(hits.iter().all(|h| h.chunk.source == "doc-a"));

        let hits = cache.search(&conv("b"), "rust", 10).await.unwrap();
        assert!(hits.iter().all(|h| h.chunk.source == "doc-b"));
    }

    #[tokio::test]
    async fn test_concurrent_adds_to_same_conversation_keep_all_chunks() {
        let cache = Arc::new(cache());
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache
                    .add_documents(
                        &conv("shared"),
                        vec![Chunk::new(format!("doc-{}", i), format!("chunk {}", i))],
                    )
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.chunk_count(&conv("shared")).await, 8);
    }

    #[tokio::test]
    async fn test_search_source_filters_documents() {
        let cache = cache();
        cache
            .add_documents(
                &conv("a"),
                vec![Chunk::new("one", "rust"), Chunk::new("two", "rust go")],
            )
            .await
            .unwrap();

        let hits = cache.search_source(&conv("a"), "two", "rust", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source, "two");
        assert_eq!(cache.source_len(&conv("a"), "one").await, 1);
    }

    #[tokio::test]
    async fn test_close_drops_index() {
        let cache = cache();
        cache
            .add_documents(&conv("a"), vec![Chunk::new("doc", "rust")])
            .await
            .unwrap();

        assert!(cache.close(&conv("a")));
        assert!(!cache.close(&conv("a")));
        assert!(cache.search(&conv("a"), "rust", 3).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_indexes_are_evicted() {
        let cache = cache();
        cache
            .add_documents(&conv("old"), vec![Chunk::new("doc", "rust")])
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        cache
            .add_documents(&conv("fresh"), vec![Chunk::new("doc", "go")])
            .await
            .unwrap();
        assert_eq!(cache.evict_idle(), 0);

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(cache.evict_idle(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.chunk_count(&conv("fresh")).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_keeps_index_alive() {
        let cache = cache();
        cache
            .add_documents(&conv("a"), vec![Chunk::new("doc", "rust")])
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(50)).await;
        cache.search(&conv("a"), "rust", 1).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(cache.evict_idle(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_and_stops() {
        let cache = Arc::new(cache());
        cache
            .add_documents(&conv("a"), vec![Chunk::new("doc", "rust")])
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = cache.spawn_sweeper(Duration::from_secs(10), cancel.clone());

        tokio::time::sleep(Duration::from_secs(75)).await;
        assert!(cache.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }
}
