//! Core traits and types for the query router
//!
//! This crate defines the boundaries between the routing engine and the
//! services it coordinates: text generation, image captioning, embeddings,
//! vector search and retrieval. Everything behind these traits is swappable,
//! which keeps the router testable with in-process fakes.

pub mod conversation;
pub mod document_indexer;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod retrieval;
pub mod vector_store;
pub mod vision;

#[cfg(test)]
mod tests;

pub use conversation::{ConversationTurn, Role};
pub use document_indexer::{Document, DocumentIndexer, IndexingConfig, IndexingResult};
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use llm::{GenerationConfig, GenerationProvider, GenerationResult};
pub use retrieval::{RetrievedChunk, Retriever, sort_best_first};
pub use vector_store::{SearchConfig, SearchResult, VectorDocument, VectorStore};
pub use vision::{Caption, MAX_CAPTION_TAGS, VisionProvider, extract_tags};
