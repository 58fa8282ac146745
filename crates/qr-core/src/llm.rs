//! Text generation provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ConversationTurn, Result};

/// Configuration for text generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub stop_sequences: Vec<String>,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: "llama3.2:3b".to_string(),
            max_tokens: 512,
            temperature: Some(0.7),
            top_p: Some(0.9),
            stop_sequences: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Result of a text generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_id: String,
    pub tokens_used: Option<u32>,
}

/// Trait for language model backends (e.g., Ollama, hosted APIs)
///
/// The router owns prompt assembly; a provider only turns a finished prompt,
/// plus optional prior turns, into text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate an answer for `prompt`, with `context` as earlier chat turns
    async fn generate(&self, prompt: &str, context: &[ConversationTurn]) -> Result<GenerationResult>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
