//! Retrieval boundary
//!
//! Relevance is cosine similarity: higher is better. Every retriever returns
//! chunks best-first, with ties broken by `source_id` and then `chunk_id` so
//! that a fixed corpus and query always produce the same sequence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A piece of corpus text returned for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub source_id: String,
    pub title: String,
    pub category: String,
    pub text: String,
    pub relevance_score: f32,
}

/// Search over the document corpus
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `k` chunks for `query`, best-first. An empty corpus
    /// yields an empty sequence.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Number of indexed chunks
    async fn count(&self) -> Result<usize>;
}

/// Sort chunks into the canonical best-first order
pub fn sort_best_first(chunks: &mut [RetrievedChunk]) {
    chunks.sort_by(|a, b| {
        b.relevance_score
            .total_cmp(&a.relevance_score)
            .then_with(|| a.source_id.cmp(&b.source_id))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
}
