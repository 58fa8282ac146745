//! Ollama configuration

use qr_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_GENERATION_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_VISION_MODEL: &str = "llava:7b";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the Ollama model server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub generation_model: String,
    pub vision_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

impl OllamaConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let generation_model =
            env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string());
        let vision_model =
            env::var("VISION_MODEL").unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string());
        let embedding_model =
            env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());

        let timeout_secs = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::Configuration(format!("REQUEST_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            host,
            generation_model,
            vision_model,
            embedding_model,
            timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create configuration with explicit host and default models
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Check that the host is an http(s) URL and the timeout is usable
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.host)
            .map_err(|e| Error::Configuration(format!("Invalid OLLAMA_HOST '{}': {}", self.host, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Configuration(format!(
                "OLLAMA_HOST must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Configuration("REQUEST_TIMEOUT_SECS must be positive".to_string()));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Join an API path onto the host
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.host.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}
