//! Document indexer: chunk, embed and store corpus records

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use qr_core::{
    Document, DocumentIndexer, Embedder, Error, IndexingConfig, IndexingResult, Result,
    VectorDocument, VectorStore,
};

/// Indexer that embeds chunks with any `Embedder` into any `VectorStore`
pub struct LocalDocumentIndexer<V: VectorStore, E: Embedder> {
    vector_store: Arc<V>,
    embedder: Arc<E>,
    config: IndexingConfig,
}

impl<V: VectorStore, E: Embedder> LocalDocumentIndexer<V, E> {
    /// Create a new local document indexer
    pub fn new(vector_store: Arc<V>, embedder: Arc<E>) -> Self {
        Self {
            vector_store,
            embedder,
            config: IndexingConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(vector_store: Arc<V>, embedder: Arc<E>, config: IndexingConfig) -> Result<Self> {
        if config.chunk_size == 0 || config.chunk_overlap >= config.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than a positive chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }

        Ok(Self {
            vector_store,
            embedder,
            config,
        })
    }

    /// Chunk text into overlapping character windows
    fn chunk_document(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let chars: Vec<char> = content.chars().collect();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.config.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            chunks.push(chunk);

            if end >= chars.len() {
                break;
            }

            start = end - self.config.chunk_overlap;
        }

        chunks
    }
}

fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{}_{}", document_id, index)
}

#[async_trait]
impl<V: VectorStore + 'static, E: Embedder + 'static> DocumentIndexer for LocalDocumentIndexer<V, E> {
    async fn index_document(&self, document: Document) -> Result<IndexingResult> {
        let chunks = self.chunk_document(&document.searchable_text());
        let vectors = self.embedder.embed_batch(&chunks).await?;
        let chunk_count = chunks.len();

        let vector_docs: Vec<VectorDocument> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk, embedding))| VectorDocument {
                id: chunk_id(&document.id, i),
                content: chunk,
                embedding: Some(embedding),
                metadata: json!({
                    "source_id": document.id,
                    "title": document.title,
                    "category": document.category,
                    "origin": document.origin,
                    "chunk_index": i,
                }),
                score: None,
            })
            .collect();

        let stored = self
            .vector_store
            .store_batch(vector_docs)
            .await
            .map_err(|e| Error::DocumentIndexer(format!("Failed to store chunks of {}: {}", document.id, e)))?;

        // a re-indexed document may now have fewer chunks than before
        let mut stale = chunk_count;
        while self.vector_store.get(&chunk_id(&document.id, stale)).await?.is_some() {
            self.vector_store.delete(&chunk_id(&document.id, stale)).await?;
            stale += 1;
        }
        if stale > chunk_count {
            debug!(document = %document.id, removed = stale - chunk_count, "removed stale chunks");
        }

        debug!(document = %document.id, chunks = stored.len(), "indexed document");
        Ok(IndexingResult {
            documents_indexed: stored.len(),
            ..Default::default()
        })
    }

    async fn index_documents(&self, documents: Vec<Document>) -> Result<IndexingResult> {
        let mut total = IndexingResult::default();

        for document in documents {
            let id = document.id.clone();
            match self.index_document(document).await {
                Ok(result) => total.merge(result),
                Err(e) => {
                    warn!(document = %id, error = %e, "failed to index document");
                    total.documents_failed += 1;
                    total.errors.push(format!("Failed to index document {}: {}", id, e));
                }
            }
        }

        Ok(total)
    }

    async fn stats(&self) -> Result<serde_json::Value> {
        let count = self.vector_store.count().await?;
        Ok(json!({
            "total_chunks": count,
            "chunk_size": self.config.chunk_size,
            "chunk_overlap": self.config.chunk_overlap,
            "embedding_model": self.embedder.model_id(),
        }))
    }
}
