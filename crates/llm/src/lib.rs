//! Chat-completion integration
//!
//! Features:
//! - OpenAI-compatible backend (Groq, Gemini, OpenAI, vLLM)
//! - Ollama backend for local models
//! - Named-placeholder prompt templates
//! - Factory building backends from settings

pub mod backend;
pub mod factory;
pub mod prompt;

pub use backend::{
    Completion, FinishReason, LlmBackend, OllamaBackend, OllamaConfig, OpenAIBackend, OpenAIConfig,
};
pub use factory::{LlmFactory, LlmProviderConfig};
pub use prompt::{Message, PromptTemplate, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Reply from {0} truncated at the token limit")]
    Truncated(String),
}

impl LlmError {
    /// Failures caused by the remote model rather than local setup
    pub fn is_upstream(&self) -> bool {
        !matches!(self, LlmError::Configuration(_) | LlmError::Prompt(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
