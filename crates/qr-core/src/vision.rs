//! Image captioning trait and caption tag extraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::Result;

/// Maximum number of tags derived from a caption
pub const MAX_CAPTION_TAGS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "in", "on", "at", "to", "for", "with", "by",
    "from", "into", "onto", "over", "under", "near", "next", "beside", "behind", "above",
    "below", "is", "are", "was", "were", "be", "been", "being", "has", "have", "had", "it",
    "its", "this", "that", "these", "those", "there", "their", "they", "he", "she", "his",
    "her", "him", "them", "some", "very", "while", "who", "which", "what", "as", "up", "down",
    "out", "off", "front", "top", "side", "image", "picture", "photo", "shows", "showing",
    "appears", "looks", "like", "can", "seen", "two", "three", "one",
];

/// Caption produced for an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub tags: Vec<String>,
}

impl Caption {
    /// Build a caption, deriving its tags from the text
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into().trim().to_string();
        let tags = extract_tags(&text, MAX_CAPTION_TAGS);
        Self { text, tags }
    }
}

/// Derive tags from a caption: content words in order of first occurrence,
/// lowercased, deduplicated, at most `limit` of them.
pub fn extract_tags(caption: &str, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    caption
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|word| word.trim_matches('\'').to_lowercase())
        .filter(|word| word.chars().count() > 2)
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .take(limit)
        .collect()
}

/// Trait for image captioning backends
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Describe an image
    async fn caption(&self, image: &[u8]) -> Result<Caption>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
