//! Configuration management for the form agent
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (FORM_AGENT prefix, `__` separator)
//! - Provider API keys from GROQ_API_KEY / GOOGLE_API_KEY

pub mod constants;
pub mod prompts;
pub mod settings;

pub use prompts::PromptsConfig;
pub use settings::{
    default_fields, load_settings, load_settings_from, FormConfig, LlmConfig, LlmProviderKind,
    ObservabilityConfig, RuntimeEnvironment, ServerConfig, SessionConfig, Settings, SttConfig,
    SttTask, TranslationConfig, UploadConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
