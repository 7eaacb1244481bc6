//! Main settings module

use config::{Config, Environment, File};
use form_agent_core::{FieldDescriptor, FieldKind, FieldSchedule, Language};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{endpoints, models, sessions, timeouts, uploads};
use crate::{ConfigError, PromptsConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat model used for question generation and extraction
    #[serde(default)]
    pub llm: LlmConfig,

    /// Model used to translate user input and questions
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Speech-to-text service
    #[serde(default)]
    pub stt: SttConfig,

    /// Field schedule and languages
    #[serde(default)]
    pub form: FormConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Session store limits
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Audio upload handling
    #[serde(default)]
    pub uploads: UploadConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_models()?;
        self.validate_sessions()?;
        self.prompts.validate()?;
        self.form.schedule()?;

        if self.uploads.max_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "uploads.max_bytes".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port must be non-zero".to_string(),
            });
        }

        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    fn validate_models(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", self.llm.temperature),
            });
        }

        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "translation.temperature".to_string(),
                message: format!(
                    "Must be between 0.0 and 2.0, got {}",
                    self.translation.temperature
                ),
            });
        }

        let timeouts = [
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("translation.timeout_secs", self.translation.timeout_secs),
            ("stt.timeout_secs", self.stt.timeout_secs),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "Timeout must be greater than 0".to_string(),
                });
            }
        }

        // Missing keys only fail hard outside development
        if self.environment.is_strict() {
            if self.llm.api_key.is_none() && self.llm.provider.requires_api_key() {
                return Err(ConfigError::MissingField("llm.api_key".to_string()));
            }
            if self.translation.enabled
                && self.translation.api_key.is_none()
                && self.translation.provider.requires_api_key()
            {
                return Err(ConfigError::MissingField("translation.api_key".to_string()));
            }
            if self.stt.enabled && self.stt.api_key.is_none() {
                return Err(ConfigError::MissingField("stt.api_key".to_string()));
            }
        }

        Ok(())
    }

    fn validate_sessions(&self) -> Result<(), ConfigError> {
        if self.sessions.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions.max_sessions".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.sessions.cleanup_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions.cleanup_interval_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Restrict CORS to `cors_origins`; when false every origin is allowed
    #[serde(default)]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout() -> u64 {
    timeouts::HTTP_REQUEST_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: false,
            cors_origins: Vec::new(),
        }
    }
}

/// Chat-completion provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// Any OpenAI-compatible endpoint (Groq, Gemini, OpenAI, vLLM)
    #[default]
    OpenAI,
    /// Local Ollama server
    Ollama,
}

impl LlmProviderKind {
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI)
    }
}

/// Chat model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key, falls back to GROQ_API_KEY
    #[serde(default = "default_groq_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String {
    std::env::var("LLM_ENDPOINT").unwrap_or_else(|_| endpoints::GROQ_DEFAULT.to_string())
}

fn default_groq_api_key() -> Option<String> {
    std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty())
}

fn default_llm_model() -> String {
    models::CHAT_DEFAULT.to_string()
}

fn default_llm_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    512
}

fn default_llm_timeout() -> u64 {
    timeouts::LLM_REQUEST_SECS
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            endpoint: default_llm_endpoint(),
            api_key: default_groq_api_key(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Translation model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// When false, input and questions pass through untranslated
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub provider: LlmProviderKind,

    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,

    /// API key, falls back to GOOGLE_API_KEY
    #[serde(default = "default_google_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_translation_model")]
    pub model: String,

    #[serde(default = "default_translation_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_translation_endpoint() -> String {
    std::env::var("TRANSLATION_ENDPOINT")
        .unwrap_or_else(|_| endpoints::GEMINI_DEFAULT.to_string())
}

fn default_google_api_key() -> Option<String> {
    std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty())
}

fn default_translation_model() -> String {
    models::TRANSLATION_DEFAULT.to_string()
}

fn default_translation_temperature() -> f32 {
    0.2
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: LlmProviderKind::default(),
            endpoint: default_translation_endpoint(),
            api_key: default_google_api_key(),
            model: default_translation_model(),
            temperature: default_translation_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Which Whisper endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SttTask {
    /// `/audio/translations`: output is always English
    #[default]
    Translate,
    /// `/audio/transcriptions`: output stays in the spoken language
    Transcribe,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_stt_endpoint")]
    pub endpoint: String,

    /// API key, falls back to GROQ_API_KEY
    #[serde(default = "default_groq_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_stt_model")]
    pub model: String,

    #[serde(default)]
    pub task: SttTask,

    /// Language tag used only when the service does not report one
    #[serde(default = "default_fallback_language")]
    pub fallback_language: String,

    #[serde(default = "default_stt_timeout")]
    pub timeout_secs: u64,
}

fn default_stt_endpoint() -> String {
    std::env::var("STT_ENDPOINT").unwrap_or_else(|_| endpoints::GROQ_DEFAULT.to_string())
}

fn default_stt_model() -> String {
    models::WHISPER_DEFAULT.to_string()
}

fn default_fallback_language() -> String {
    Language::Nepali.code().to_string()
}

fn default_stt_timeout() -> u64 {
    timeouts::STT_REQUEST_SECS
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_stt_endpoint(),
            api_key: default_groq_api_key(),
            model: default_stt_model(),
            task: SttTask::default(),
            fallback_language: default_fallback_language(),
            timeout_secs: default_stt_timeout(),
        }
    }
}

/// Form definition: languages plus the field schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Language assumed for non-Latin user input
    #[serde(default = "default_form_language")]
    pub source_language: Language,

    /// Language questions are shown in
    #[serde(default = "default_form_language")]
    pub display_language: Language,

    /// Ordered fields to collect
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldDescriptor>,

    /// Optional YAML file holding the field list; replaces `fields` when set
    #[serde(default)]
    pub fields_file: Option<PathBuf>,
}

fn default_form_language() -> Language {
    Language::Nepali
}

/// Machine rental listing
pub fn default_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("toolName", "Name of the machine/tool"),
        FieldDescriptor::new(
            "category",
            "Category of the machine (Tractor, Tiller, Harvester)",
        ),
        FieldDescriptor::new("rentalPricePerHour", "Rental price per hour")
            .with_kind(FieldKind::Number),
        FieldDescriptor::new("availableFrom", "Start date when the machine is available")
            .with_kind(FieldKind::Date),
        FieldDescriptor::new("availableTo", "End date when the machine is available")
            .with_kind(FieldKind::Date),
        FieldDescriptor::new("location", "Location where the machine is available"),
        FieldDescriptor::new("pickupOption", "Pickup option (Delivery, Self-Pickup, Both)"),
        FieldDescriptor::new("rentalTerms", "Rental terms and conditions"),
        FieldDescriptor::new("machineImage", "URL of the machine image"),
        FieldDescriptor::new("cloudinaryId", "Cloudinary public_id for image deletion"),
    ]
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            source_language: default_form_language(),
            display_language: default_form_language(),
            fields: default_fields(),
            fields_file: None,
        }
    }
}

impl FormConfig {
    /// Build the validated schedule, reading `fields_file` when configured
    pub fn schedule(&self) -> Result<FieldSchedule, ConfigError> {
        let fields = match &self.fields_file {
            Some(path) => load_fields_file(path)?,
            None => self.fields.clone(),
        };

        FieldSchedule::new(fields).map_err(|e| ConfigError::InvalidValue {
            field: "form.fields".to_string(),
            message: e.to_string(),
        })
    }
}

fn load_fields_file(path: &Path) -> Result<Vec<FieldDescriptor>, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
    tracing::debug!(path = %path.display(), "Loading field schedule");
    serde_yaml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle seconds before a session is evicted
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_max_sessions() -> usize {
    sessions::MAX_SESSIONS
}

fn default_idle_timeout() -> u64 {
    sessions::IDLE_TIMEOUT_SECS
}

fn default_cleanup_interval() -> u64 {
    sessions::CLEANUP_INTERVAL_SECS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_timeout_secs: default_idle_timeout(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Audio upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory uploaded recordings are written to before transcription
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,

    /// Maximum request body size in bytes
    #[serde(default = "default_upload_max_bytes")]
    pub max_bytes: usize,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from(uploads::DEFAULT_DIR)
}

fn default_upload_max_bytes() -> usize {
    uploads::MAX_BYTES
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_bytes: default_upload_max_bytes(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/` in the working directory
///
/// Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit config directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    tracing::debug!(dir = %dir.display(), env = ?env, "Loading settings");
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::from(dir.join("default")).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("FORM_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    Ok(settings)
}
