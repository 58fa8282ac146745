//! Deterministic feature-hashing embedder
//!
//! Each content word is hashed with MD5 into one of `dimensions` buckets
//! with a hash-derived sign, term frequencies are accumulated and the vector
//! is L2-normalized. No model or network is involved, so the same text always
//! yields the same vector on every platform.

use async_trait::async_trait;

use qr_core::{Embedder, Error, Result};

pub const DEFAULT_DIMENSIONS: usize = 512;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "in", "on", "at", "to", "for", "with", "by",
    "from", "as", "is", "are", "was", "were", "be", "been", "it", "its", "this", "that",
    "these", "those", "what", "which", "who", "how", "why", "when", "where", "does", "do",
    "did", "can", "could", "should", "would", "will", "me", "my", "you", "your", "we", "our",
    "they", "their", "them", "tell", "about", "explain", "describe", "please", "into", "own",
    "one", "another", "each", "other", "such", "also", "than", "then", "there", "here",
];

/// Hashing embedder with no external model
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Configuration(
                "Embedding dimensions must be positive".to_string(),
            ));
        }

        Ok(Self {
            dimensions,
            model_id: format!("hashing-md5-{}", dimensions),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Lowercased content words of `text`
    pub fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(|word| word.to_lowercase())
            .filter(|word| word.chars().count() > 1)
            .filter(|word| !STOP_WORDS.contains(&word.as_str()))
            .collect()
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = md5::compute(token.as_bytes());
        let raw = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
        let index = raw as usize % self.dimensions;
        let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }

    /// Synchronous embedding used by the async trait method
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in Self::tokenize(text) {
            let (index, sign) = self.bucket(&token);
            vector[index] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in vector.iter_mut() {
                *value /= norm;
            }
        }

        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            model_id: format!("hashing-md5-{}", DEFAULT_DIMENSIONS),
        }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
