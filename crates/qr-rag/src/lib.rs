//! Retrieval for the query router
//!
//! This crate provides the document corpus, a deterministic hashing
//! embedder, an in-memory vector store, a document indexer and the
//! `LocalRetriever` that implements the retrieval boundary.

mod corpus;
mod document_indexer;
mod embedder;
mod engine;
mod vector_store;


pub use corpus::{CUSTOM_ID_PREFIX, builtin_documents, load_markdown_dir, parse_markdown};
pub use document_indexer::LocalDocumentIndexer;
pub use embedder::{DEFAULT_DIMENSIONS, HashingEmbedder};
pub use engine::LocalRetriever;
pub use vector_store::LocalVectorStore;

// Re-export core types for convenience
pub use qr_core::{
    Document, DocumentIndexer, Embedder, Error, IndexingConfig, IndexingResult, Result,
    RetrievedChunk, Retriever, SearchConfig, SearchResult, VectorDocument, VectorStore,
};
