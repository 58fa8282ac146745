//! Document indexer trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A corpus record to be indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub origin: String,
    pub category: String,
}

impl Document {
    /// Text that gets embedded and returned on retrieval
    pub fn searchable_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.content.trim())
    }
}

/// Result of an indexing operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingResult {
    pub documents_indexed: usize,
    pub documents_failed: usize,
    pub errors: Vec<String>,
}

impl IndexingResult {
    pub fn merge(&mut self, other: IndexingResult) {
        self.documents_indexed += other.documents_indexed;
        self.documents_failed += other.documents_failed;
        self.errors.extend(other.errors);
    }
}

/// Configuration for document indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Trait for document indexers
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Index a single document
    async fn index_document(&self, document: Document) -> Result<IndexingResult>;

    /// Index multiple documents
    async fn index_documents(&self, documents: Vec<Document>) -> Result<IndexingResult>;

    /// Get indexing statistics
    async fn stats(&self) -> Result<serde_json::Value>;
}
