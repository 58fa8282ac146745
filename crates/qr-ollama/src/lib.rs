//! Ollama integration for the query router
//!
//! This crate provides model-server implementations of the generation,
//! vision and embedding boundaries defined in `qr-core`.

mod client;
mod config;


pub use client::{OllamaClient, OllamaEmbedder, OllamaGenerator, OllamaVision};
pub use config::OllamaConfig;

// Re-export core types for convenience
pub use qr_core::{
    Caption, ConversationTurn, Embedder, Error, GenerationConfig, GenerationProvider,
    GenerationResult, Result, VisionProvider,
};
