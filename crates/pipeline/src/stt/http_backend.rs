//! Hosted Whisper STT backend
//!
//! Uploads a recording to an OpenAI-compatible audio endpoint (Groq by
//! default). In translate mode the service answers in English whatever the
//! spoken language, so no separate translation call is needed for audio.
//!
//! The language tag comes from the service's `verbose_json` response. The
//! configured fallback is only used when the service leaves it out.

use async_trait::async_trait;
use form_agent_config::{SttConfig, SttTask};
use form_agent_core::{Language, SpeechToText, Transcript};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::PipelineError;

/// Whisper backend configuration
#[derive(Debug, Clone)]
pub struct WhisperHttpConfig {
    /// Base URL of the OpenAI-compatible API
    pub endpoint: String,
    /// Bearer token
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Translate to English or transcribe as spoken
    pub task: SttTask,
    /// Language tag reported when the service omits one
    pub fallback_language: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for WhisperHttpConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: String::new(),
            model: "whisper-large-v3".to_string(),
            task: SttTask::Translate,
            fallback_language: "ne".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl From<&SttConfig> for WhisperHttpConfig {
    fn from(cfg: &SttConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone().unwrap_or_default(),
            model: cfg.model.clone(),
            task: cfg.task,
            fallback_language: cfg.fallback_language.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

/// `verbose_json` response body (plain `json` only carries `text`)
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f32>,
}

/// Whisper over HTTP
pub struct WhisperHttpStt {
    config: WhisperHttpConfig,
    client: reqwest::Client,
}

impl WhisperHttpStt {
    /// Create a new Whisper backend
    pub fn new(config: WhisperHttpConfig) -> Result<Self, PipelineError> {
        if config.api_key.is_empty() {
            return Err(PipelineError::Configuration(
                "API key required for the STT endpoint".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn audio_url(&self) -> String {
        let path = match self.config.task {
            SttTask::Translate => "audio/translations",
            SttTask::Transcribe => "audio/transcriptions",
        };
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// Upload `audio_path` and parse the service reply
    async fn request(&self, audio_path: &Path) -> Result<Transcript, PipelineError> {
        let start = Instant::now();
        let bytes = tokio::fs::read(audio_path).await?;
        if bytes.is_empty() {
            return Err(PipelineError::Stt("audio file is empty".to_string()));
        }

        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        let form = Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .text("temperature", "0")
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.audio_url())
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api(format!("HTTP {}: {}", status, body)));
        }

        let body: WhisperResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))?;

        let transcript = self.to_transcript(body);

        tracing::info!(
            language = %transcript.language,
            chars = transcript.text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Whisper transcription finished"
        );

        Ok(transcript)
    }

    fn to_transcript(&self, body: WhisperResponse) -> Transcript {
        let language = body
            .language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(normalize_language_tag)
            .unwrap_or_else(|| self.config.fallback_language.clone());

        Transcript {
            text: body.text.trim().to_string(),
            language,
            duration_secs: body.duration,
        }
    }
}

/// Whisper reports full names ("nepali"); map known ones to ISO codes
fn normalize_language_tag(raw: &str) -> String {
    Language::from_str_loose(raw)
        .map(|lang| lang.code().to_string())
        .unwrap_or_else(|| raw.to_lowercase())
}

#[async_trait]
impl SpeechToText for WhisperHttpStt {
    async fn transcribe(&self, audio_path: &Path) -> form_agent_core::Result<Transcript> {
        Ok(self.request(audio_path).await?)
    }

    fn outputs_english(&self) -> bool {
        self.config.task == SttTask::Translate
    }

    fn name(&self) -> &str {
        "whisper-http"
    }
}
