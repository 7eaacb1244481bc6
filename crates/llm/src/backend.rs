//! Chat-completion backends
//!
//! Both backends are non-streaming: every call the form agent makes needs the
//! complete reply before it can continue.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::prompt::Message;
use crate::LlmError;

/// Upper bound for availability probes, independent of the request timeout
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long Ollama keeps the model loaded after a call
pub const OLLAMA_KEEP_ALIVE: &str = "5m";

/// Why the model stopped producing tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Hit `max_tokens`; the reply is cut off
    Length,
}

impl FinishReason {
    fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => FinishReason::Length,
            _ => FinishReason::Stop,
        }
    }
}

/// One chat reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: FinishReason,
}

impl Completion {
    /// A reply that ended normally
    pub fn stop(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: FinishReason::Stop,
        }
    }
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn chat(&self, messages: &[Message]) -> Result<Completion, LlmError>;

    /// Send a single user prompt and return the trimmed reply.
    ///
    /// A reply cut off at the token limit is an error: a half-written
    /// question or JSON object is never usable.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let completion = self.chat(&[Message::user(prompt)]).await?;
        if completion.finish_reason == FinishReason::Length {
            tracing::warn!(model = self.model_name(), "Reply truncated at token limit");
            return Err(LlmError::Truncated(self.model_name().to_string()));
        }
        Ok(completion.text.trim().to_string())
    }

    /// Whether the endpoint answers at all
    async fn is_available(&self) -> bool;

    fn model_name(&self) -> &str;
}

/// Send a request and decode a JSON body, mapping non-2xx to `LlmError::Api`
async fn send_json<R: DeserializeOwned>(request: RequestBuilder) -> Result<R, LlmError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

async fn probe(request: RequestBuilder) -> bool {
    request
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}

fn build_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Configuration(e.to_string()))
}

// =============================================================================
// Ollama
// =============================================================================

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
    /// Keep model loaded between calls ("5m", "1h", "-1", "0")
    pub keep_alive: String,
}

/// Local Ollama server (`/api/chat`)
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn chat(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        let request = OllamaChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
            keep_alive: &self.config.keep_alive,
        };

        let response: OllamaChatResponse =
            send_json(self.client.post(self.api_url("/chat")).json(&request)).await?;

        Ok(Completion {
            text: response.message.content,
            finish_reason: FinishReason::from_api(response.done_reason.as_deref()),
        })
    }

    async fn is_available(&self) -> bool {
        probe(self.client.get(self.api_url("/tags"))).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: OllamaOptions,
    keep_alive: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaReply,
    #[serde(default)]
    done_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaReply {
    content: String,
}

// =============================================================================
// OpenAI-compatible
// =============================================================================

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API base, e.g. `https://api.groq.com/openai/v1`
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

/// OpenAI-compatible `/chat/completions` (Groq, Gemini, OpenAI, vLLM)
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() && !is_local(&config.endpoint) {
            return Err(LlmError::Configuration(format!(
                "API key required for {}",
                config.endpoint
            )));
        }

        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }
}

fn is_local(endpoint: &str) -> bool {
    endpoint.starts_with("http://localhost") || endpoint.starts_with("http://127.0.0.1")
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn chat(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        let request = OpenAIChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response: OpenAIChatResponse = send_json(
            self.client
                .post(self.url("/chat/completions"))
                .bearer_auth(&self.config.api_key)
                .json(&request),
        )
        .await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        tracing::debug!(
            model = %self.config.model,
            finish_reason = ?choice.finish_reason,
            "Chat completion finished"
        );

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
        })
    }

    async fn is_available(&self) -> bool {
        probe(
            self.client
                .get(self.url("/models"))
                .bearer_auth(&self.config.api_key),
        )
        .await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIReply,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIReply {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groq_config(api_key: &str) -> OpenAIConfig {
        OpenAIConfig {
            endpoint: "https://api.groq.com/openai/v1/".to_string(),
            api_key: api_key.to_string(),
            model: "openai/gpt-oss-20b".to_string(),
            max_tokens: 256,
            temperature: 0.7,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_openai_backend_requires_key_for_remote() {
        assert!(matches!(
            OpenAIBackend::new(groq_config("")),
            Err(LlmError::Configuration(_))
        ));
        assert!(OpenAIBackend::new(groq_config("gsk-xxx")).is_ok());

        let local = OpenAIConfig {
            endpoint: "http://localhost:8000/v1".to_string(),
            ..groq_config("")
        };
        assert!(OpenAIBackend::new(local).is_ok());
    }

    #[test]
    fn test_openai_urls() {
        let backend = OpenAIBackend::new(groq_config("gsk-xxx")).unwrap();
        assert_eq!(
            backend.url("/chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(backend.url("/models"), "https://api.groq.com/openai/v1/models");
    }

    #[test]
    fn test_request_bodies() {
        let messages = [Message::user("Hello")];

        let openai = OpenAIChatRequest {
            model: "openai/gpt-oss-20b",
            messages: &messages,
            max_tokens: 256,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&openai).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert_eq!(json["max_tokens"], 256);

        let ollama = OllamaChatRequest {
            model: "qwen2.5:7b-instruct",
            messages: &messages,
            stream: false,
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: 64,
            },
            keep_alive: OLLAMA_KEEP_ALIVE,
        };
        let json = serde_json::to_value(&ollama).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 64);
        assert_eq!(json["keep_alive"], "5m");
    }

    #[test]
    fn test_openai_response_finish_reason() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null},"finish_reason":"length"}]}"#;
        let response: OpenAIChatResponse = serde_json::from_str(body).unwrap();
        assert!(response.choices[0].message.content.is_none());
        assert_eq!(
            FinishReason::from_api(response.choices[0].finish_reason.as_deref()),
            FinishReason::Length
        );
        assert_eq!(FinishReason::from_api(Some("stop")), FinishReason::Stop);
        assert_eq!(FinishReason::from_api(None), FinishReason::Stop);
    }

    struct FixedBackend(Completion);

    #[async_trait]
    impl LlmBackend for FixedBackend {
        async fn chat(&self, _messages: &[Message]) -> Result<Completion, LlmError> {
            Ok(self.0.clone())
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_complete_trims_reply() {
        let backend = FixedBackend(Completion::stop("  What is the tool name?\n"));
        assert_eq!(
            backend.complete("ignored").await.unwrap(),
            "What is the tool name?"
        );
    }

    #[tokio::test]
    async fn test_complete_rejects_truncated_reply() {
        let backend = FixedBackend(Completion {
            text: "{\"value\": \"Trac".to_string(),
            finish_reason: FinishReason::Length,
        });
        assert!(matches!(
            backend.complete("ignored").await,
            Err(LlmError::Truncated(model)) if model == "fixed"
        ));
    }
}
