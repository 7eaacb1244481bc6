//! LLM Factory - Provider Abstraction Layer
//!
//! Creates LLM backends from settings. The question/extraction model and the
//! translation model are configured separately but built the same way.
//!
//! ## Example
//! ```ignore
//! let chat = LlmFactory::create(&LlmProviderConfig::from(&settings.llm))?;
//! let translator = LlmFactory::create(&LlmProviderConfig::from(&settings.translation))?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use form_agent_config::{self as config, LlmProviderKind};

use crate::backend::{
    LlmBackend, OllamaBackend, OllamaConfig, OpenAIBackend, OpenAIConfig, OLLAMA_KEEP_ALIVE,
};
use crate::LlmError;

/// Unified provider configuration
#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    pub provider: LlmProviderKind,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

impl From<&config::LlmConfig> for LlmProviderConfig {
    fn from(cfg: &config::LlmConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

impl From<&config::TranslationConfig> for LlmProviderConfig {
    fn from(cfg: &config::TranslationConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

/// Builds `LlmBackend` trait objects
pub struct LlmFactory;

impl LlmFactory {
    pub fn create(config: &LlmProviderConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
        let backend: Arc<dyn LlmBackend> = match config.provider {
            LlmProviderKind::OpenAI => {
                let api_key = config.api_key.clone().unwrap_or_default();
                Arc::new(OpenAIBackend::new(OpenAIConfig {
                    endpoint: config.endpoint.clone(),
                    api_key,
                    model: config.model.clone(),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    timeout: config.timeout,
                })?)
            }
            LlmProviderKind::Ollama => Arc::new(OllamaBackend::new(OllamaConfig {
                endpoint: config.endpoint.clone(),
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                timeout: config.timeout,
                keep_alive: OLLAMA_KEEP_ALIVE.to_string(),
            })?),
        };

        tracing::info!(
            provider = ?config.provider,
            model = %config.model,
            endpoint = %config.endpoint,
            "Created LLM backend"
        );

        Ok(backend)
    }
}
