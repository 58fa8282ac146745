//! Retrieval engine over the embedded corpus

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use qr_core::{
    Document, DocumentIndexer, Embedder, Error, IndexingResult, Result, RetrievedChunk, Retriever,
    SearchConfig, VectorStore, sort_best_first,
};

use crate::document_indexer::LocalDocumentIndexer;

/// Default minimum cosine similarity for a chunk to count as relevant
pub const DEFAULT_MIN_RELEVANCE: f32 = 0.05;

/// Retriever that embeds the query and searches a vector store
pub struct LocalRetriever<V: VectorStore, E: Embedder> {
    vector_store: Arc<V>,
    embedder: Arc<E>,
    indexer: LocalDocumentIndexer<V, E>,
    min_relevance: f32,
}

impl<V: VectorStore + 'static, E: Embedder + 'static> LocalRetriever<V, E> {
    /// Create a new retriever over an existing store
    pub fn new(vector_store: Arc<V>, embedder: Arc<E>) -> Self {
        let indexer = LocalDocumentIndexer::new(vector_store.clone(), embedder.clone());
        Self {
            vector_store,
            embedder,
            indexer,
            min_relevance: DEFAULT_MIN_RELEVANCE,
        }
    }

    /// Chunks scoring below `min_relevance` are dropped
    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    /// Index corpus records into the underlying store
    pub async fn index(&self, documents: Vec<Document>) -> Result<IndexingResult> {
        self.indexer.index_documents(documents).await
    }

    pub async fn stats(&self) -> Result<serde_json::Value> {
        self.indexer.stats().await
    }
}

#[async_trait]
impl<V: VectorStore + 'static, E: Embedder + 'static> Retriever for LocalRetriever<V, E> {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let config = SearchConfig {
            top_k: k,
            score_threshold: Some(self.min_relevance),
        };
        let result = self
            .vector_store
            .search_by_vector(&vector, &config)
            .await
            .map_err(|e| Error::Retrieval(e.to_string()))?;

        let mut chunks: Vec<RetrievedChunk> = result
            .documents
            .into_iter()
            .map(|doc| RetrievedChunk {
                source_id: doc.metadata_str("source_id").unwrap_or(&doc.id).to_string(),
                title: doc.metadata_str("title").unwrap_or_default().to_string(),
                category: doc.metadata_str("category").unwrap_or("unknown").to_string(),
                relevance_score: doc.score.unwrap_or(0.0),
                chunk_id: doc.id,
                text: doc.content,
            })
            .collect();

        sort_best_first(&mut chunks);
        debug!(query = %query, k, returned = chunks.len(), "retrieval complete");

        Ok(chunks)
    }

    async fn count(&self) -> Result<usize> {
        self.vector_store.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HashingEmbedder, LocalVectorStore, builtin_documents};

    fn retriever() -> LocalRetriever<LocalVectorStore, HashingEmbedder> {
        LocalRetriever::new(
            Arc::new(LocalVectorStore::new()),
            Arc::new(HashingEmbedder::default()),
        )
    }

    #[tokio::test]
    async fn test_retriever_finds_docker_record() {
        let retriever = retriever();
        retriever.index(builtin_documents()).await.unwrap();

        let chunks = retriever.search("What is Docker?", 3).await.unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 3);
        assert_eq!(chunks[0].source_id, "docker_intro");
        assert!(chunks.iter().all(|c| c.source_id.starts_with("docker")));
        assert!(chunks.windows(2).all(|w| w[0].relevance_score >= w[1].relevance_score));
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_no_chunks() {
        let retriever = retriever();
        let chunks = retriever.search("What is Docker?", 3).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_deterministic() {
        let retriever = retriever();
        retriever.index(builtin_documents()).await.unwrap();

        let first = retriever.search("machine learning algorithms", 3).await.unwrap();
        let second = retriever.search("machine learning algorithms", 3).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_blank_query_or_zero_k() {
        let retriever = retriever();
        retriever.index(builtin_documents()).await.unwrap();

        assert!(retriever.search("   ", 3).await.unwrap().is_empty());
        assert!(retriever.search("Docker", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_a_retrieval_error() {
        let retriever = LocalRetriever::new(
            Arc::new(crate::vector_store::FailingStore),
            Arc::new(HashingEmbedder::default()),
        );

        let result = retriever.search("What is Docker?", 3).await;
        assert!(matches!(result, Err(Error::Retrieval(_))));
    }
}
