//! Router configuration

use qr_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RETRIEVAL_K: usize = 3;
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
/// Last two exchanges go along with knowledge and chat prompts
pub const DEFAULT_HISTORY_CONTEXT_TURNS: usize = 4;

/// Identifiers of the backend services, reported in stats and logs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceIds {
    pub generation: String,
    pub vision: String,
    pub embedding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Chunks requested per SEARCH_CORPUS step
    pub retrieval_k: usize,
    /// Turns kept per user before the oldest are evicted
    pub history_capacity: usize,
    /// Recent turns passed to generation as conversation context
    pub history_context_turns: usize,
    /// Upper bound on each retrieval, generation or vision call
    pub call_timeout: Option<Duration>,
    pub services: ServiceIds,
}

impl RouterConfig {
    /// Read `RETRIEVAL_K`, `MAX_HISTORY_LENGTH` and `MODEL_CALL_TIMEOUT_SECS`
    pub fn from_env(services: ServiceIds) -> Result<Self> {
        dotenvy::dotenv().ok();

        let call_timeout = match env::var("MODEL_CALL_TIMEOUT_SECS") {
            Ok(raw) if !raw.trim().is_empty() => {
                let secs: u64 = parse_var("MODEL_CALL_TIMEOUT_SECS", &raw)?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        let config = Self {
            retrieval_k: env_or("RETRIEVAL_K", DEFAULT_RETRIEVAL_K)?,
            history_capacity: env_or("MAX_HISTORY_LENGTH", DEFAULT_HISTORY_CAPACITY)?,
            history_context_turns: DEFAULT_HISTORY_CONTEXT_TURNS,
            call_timeout,
            services,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retrieval_k == 0 {
            return Err(Error::Configuration("RETRIEVAL_K must be at least 1".to_string()));
        }
        if self.history_capacity < 2 {
            return Err(Error::Configuration(format!(
                "MAX_HISTORY_LENGTH must hold at least one exchange (2 turns), got {}",
                self.history_capacity
            )));
        }
        if self.call_timeout == Some(Duration::ZERO) {
            return Err(Error::Configuration(
                "MODEL_CALL_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_services(mut self, services: ServiceIds) -> Self {
        self.services = services;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            retrieval_k: DEFAULT_RETRIEVAL_K,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            history_context_turns: DEFAULT_HISTORY_CONTEXT_TURNS,
            call_timeout: None,
            services: ServiceIds::default(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_var(name, &raw),
        _ => Ok(default),
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| Error::Configuration(format!("{} is not a valid number: {}", name, raw)))
}
