//! Ollama HTTP client and the three model adapters built on it

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use qr_core::{
    Caption, ConversationTurn, Embedder, Error, GenerationConfig, GenerationProvider,
    GenerationResult, Result, VisionProvider,
};

use crate::config::OllamaConfig;

const CAPTION_PROMPT: &str =
    "Describe this image in one short sentence. Mention the main objects and the setting.";

/// Shared HTTP transport for the Ollama API
#[derive(Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    num_predict: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ModelOptions,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
    eval_count: Option<u32>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new client from configuration
    pub fn new(config: OllamaConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env()?)
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// POST a JSON body and decode the JSON reply, bounded by the configured timeout
    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = self.config.endpoint(path);
        debug!(url = %url, "sending model server request");

        let request = async {
            let response = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(Error::Network(format!(
                    "Ollama request to {} failed with status {}: {}",
                    path, status, error_text
                )));
            }

            response
                .json::<R>()
                .await
                .map_err(|e| Error::Serialization(e.to_string()))
        };

        match timeout(self.config.timeout(), request).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!("Request to {} timed out", path))),
        }
    }
}

fn chat_request(
    model: &str,
    prompt: &str,
    context: &[ConversationTurn],
    config: &GenerationConfig,
) -> ChatRequest {
    let mut messages: Vec<ChatMessage> = context
        .iter()
        .map(|turn| ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.text.clone(),
            images: None,
        })
        .collect();

    messages.push(ChatMessage {
        role: "user".to_string(),
        content: prompt.to_string(),
        images: None,
    });

    ChatRequest {
        model: model.to_string(),
        messages,
        stream: false,
        options: ModelOptions {
            temperature: config.temperature,
            top_p: config.top_p,
            num_predict: config.max_tokens,
            stop: config.stop_sequences.clone(),
        },
    }
}

/// Text generation through `/api/chat`
pub struct OllamaGenerator {
    client: OllamaClient,
    config: GenerationConfig,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient) -> Self {
        let config = GenerationConfig {
            model_id: client.config().generation_model.clone(),
            timeout: client.config().timeout(),
            ..Default::default()
        };
        Self { client, config }
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    async fn generate(&self, prompt: &str, context: &[ConversationTurn]) -> Result<GenerationResult> {
        let request = chat_request(&self.config.model_id, prompt, context, &self.config);

        let response: ChatResponse = self
            .client
            .post_json("/api/chat", &request)
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        let text = response.message.content.trim().to_string();
        if text.is_empty() {
            return Err(Error::Generation(format!(
                "Empty response from model {}",
                self.config.model_id
            )));
        }

        Ok(GenerationResult {
            text,
            model_id: self.config.model_id.clone(),
            tokens_used: response.eval_count,
        })
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }
}

/// Image captioning through a multimodal model
pub struct OllamaVision {
    client: OllamaClient,
    config: GenerationConfig,
}

impl OllamaVision {
    pub fn new(client: OllamaClient) -> Self {
        let config = GenerationConfig {
            model_id: client.config().vision_model.clone(),
            max_tokens: 80,
            temperature: Some(0.2),
            timeout: client.config().timeout(),
            ..Default::default()
        };
        Self { client, config }
    }
}

#[async_trait]
impl VisionProvider for OllamaVision {
    async fn caption(&self, image: &[u8]) -> Result<Caption> {
        let format = image::guess_format(image)
            .map_err(|e| Error::Vision(format!("Unrecognized image data: {}", e)))?;
        debug!(format = ?format, bytes = image.len(), "captioning image");

        let mut request = chat_request(&self.config.model_id, CAPTION_PROMPT, &[], &self.config);
        if let Some(message) = request.messages.last_mut() {
            message.images = Some(vec![BASE64.encode(image)]);
        }

        let response: ChatResponse = self
            .client
            .post_json("/api/chat", &request)
            .await
            .map_err(|e| Error::Vision(e.to_string()))?;

        let caption = Caption::from_text(response.message.content);
        if caption.text.is_empty() {
            return Err(Error::Vision("Model returned an empty caption".to_string()));
        }

        Ok(caption)
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }
}

/// Embeddings through `/api/embeddings`
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        let model = client.config().embedding_model.clone();
        Self { client, model }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response: EmbeddingResponse = self
            .client
            .post_json("/api/embeddings", &request)
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        if response.embedding.is_empty() {
            return Err(Error::Embedding(format!("Model {} returned no vector", self.model)));
        }

        Ok(response.embedding)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
