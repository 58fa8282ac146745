//! In-memory vector store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use qr_core::{Error, Result, SearchConfig, SearchResult, VectorDocument, VectorStore};

/// Local in-memory vector store ranked by cosine similarity
#[derive(Clone, Default)]
pub struct LocalVectorStore {
    documents: Arc<RwLock<HashMap<String, VectorDocument>>>,
}

impl LocalVectorStore {
    /// Create a new local vector store
    pub fn new() -> Self {
        Self::default()
    }

    /// Cosine similarity; mismatched or zero vectors score 0
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn lock_error<E: std::fmt::Display>(e: E) -> Error {
        Error::VectorStore(format!("Lock error: {}", e))
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn store(&self, document: VectorDocument) -> Result<String> {
        let id = document.id.clone();
        let mut docs = self.documents.write().map_err(Self::lock_error)?;
        docs.insert(id.clone(), document);
        Ok(id)
    }

    async fn store_batch(&self, documents: Vec<VectorDocument>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(documents.len());
        let mut docs = self.documents.write().map_err(Self::lock_error)?;

        for document in documents {
            let id = document.id.clone();
            docs.insert(id.clone(), document);
            ids.push(id);
        }

        Ok(ids)
    }

    async fn search_by_vector(&self, vector: &[f32], config: &SearchConfig) -> Result<SearchResult> {
        let docs = self.documents.read().map_err(Self::lock_error)?;

        let mut results: Vec<VectorDocument> = docs
            .values()
            .filter_map(|doc| {
                let embedding = doc.embedding.as_ref()?;
                let score = Self::cosine_similarity(vector, embedding);
                let mut doc_with_score = doc.clone();
                doc_with_score.score = Some(score);
                Some(doc_with_score)
            })
            .filter(|doc| match config.score_threshold {
                Some(threshold) => doc.score.unwrap_or(0.0) >= threshold,
                None => true,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .total_cmp(&a.score.unwrap_or(0.0))
                .then_with(|| a.id.cmp(&b.id))
        });

        results.truncate(config.top_k);

        let total = results.len();

        Ok(SearchResult {
            documents: results,
            total,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<VectorDocument>> {
        let docs = self.documents.read().map_err(Self::lock_error)?;
        Ok(docs.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut docs = self.documents.write().map_err(Self::lock_error)?;
        Ok(docs.remove(id).is_some())
    }

    async fn count(&self) -> Result<usize> {
        let docs = self.documents.read().map_err(Self::lock_error)?;
        Ok(docs.len())
    }
}

/// Store whose writes and searches always fail
#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
#[async_trait]
impl VectorStore for FailingStore {
    async fn store(&self, _document: VectorDocument) -> Result<String> {
        Err(Error::VectorStore("disk full".to_string()))
    }

    async fn store_batch(&self, _documents: Vec<VectorDocument>) -> Result<Vec<String>> {
        Err(Error::VectorStore("disk full".to_string()))
    }

    async fn search_by_vector(&self, _vector: &[f32], _config: &SearchConfig) -> Result<SearchResult> {
        Err(Error::VectorStore("disk full".to_string()))
    }

    async fn get(&self, _id: &str) -> Result<Option<VectorDocument>> {
        Ok(None)
    }

    async fn delete(&self, _id: &str) -> Result<bool> {
        Ok(false)
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }
}
