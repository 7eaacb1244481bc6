//! End-to-end tests for the HTTP surface
//!
//! Serves the real router on an ephemeral port with stubbed model and
//! speech-to-text backends and drives it with reqwest.

use async_trait::async_trait;
use reqwest::{multipart, StatusCode};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

use form_agent_agent::FormAgent;
use form_agent_config::Settings;
use form_agent_core::{FieldDescriptor, FieldSchedule, SpeechToText, Transcript};
use form_agent_llm::{Completion, LlmBackend, LlmError, Message};
use form_agent_server::{create_router, AppState, SessionManager};

/// Answers question prompts with "What is the <field>?" and extraction
/// prompts according to the user input:
/// - `nonsense` -> the invalid sentinel
/// - `garbage` -> a reply that is not JSON
/// - anything else -> `{"value": <input>}`
struct EchoLlm {
    available: bool,
}

fn section<'a>(prompt: &'a str, heading: &str) -> &'a str {
    prompt
        .split(heading)
        .nth(1)
        .and_then(|rest| rest.lines().next())
        .unwrap_or("")
}

#[async_trait]
impl LlmBackend for EchoLlm {
    async fn chat(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        let prompt = &messages[0].content;
        let text = if prompt.contains("User input:") {
            match section(prompt, "User input:\n") {
                "nonsense" => "0".to_string(),
                "garbage" => "I think it is a tractor".to_string(),
                input => json!({ "value": input }).to_string(),
            }
        } else {
            format!("What is the {}?", section(prompt, "Field:\n").to_lowercase())
        };

        Ok(Completion::stop(text))
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

struct FixedStt;

#[async_trait]
impl SpeechToText for FixedStt {
    async fn transcribe(&self, audio_path: &Path) -> form_agent_core::Result<Transcript> {
        // The upload must exist while it is being transcribed
        assert!(audio_path.exists());
        Ok(Transcript::new("Harvester", "ne"))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Speech-to-text that is down
struct FailingStt;

#[async_trait]
impl SpeechToText for FailingStt {
    async fn transcribe(&self, _audio_path: &Path) -> form_agent_core::Result<Transcript> {
        Err(form_agent_core::Error::Stt("HTTP 503: service unavailable".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Speech-to-text slower than the server's request timeout
struct SlowStt;

#[async_trait]
impl SpeechToText for SlowStt {
    async fn transcribe(&self, audio_path: &Path) -> form_agent_core::Result<Transcript> {
        assert!(audio_path.exists());
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(Transcript::new("Too late", "ne"))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

struct TestOptions {
    max_sessions: usize,
    timeout_secs: u64,
    stt: Arc<dyn SpeechToText>,
    llm_available: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            timeout_secs: 30,
            stt: Arc::new(FixedStt),
            llm_available: true,
        }
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    uploads: TempDir,
}

impl TestServer {
    async fn spawn(max_sessions: usize) -> Self {
        Self::spawn_with(TestOptions {
            max_sessions,
            ..TestOptions::default()
        })
        .await
    }

    async fn spawn_with(options: TestOptions) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = Settings::default();
        config.uploads.dir = uploads.path().to_path_buf();
        config.sessions.max_sessions = options.max_sessions;
        config.server.timeout_seconds = options.timeout_secs;

        let schedule = FieldSchedule::new(vec![
            FieldDescriptor::new("toolName", "Name of the machine/tool"),
            FieldDescriptor::new("category", "Category of the machine"),
        ])
        .unwrap();
        let llm = Arc::new(EchoLlm {
            available: options.llm_available,
        });
        let agent = FormAgent::builder(schedule, llm).stt(options.stt).build();
        let sessions = Arc::new(SessionManager::from_config(&config.sessions));
        let app = create_router(AppState::new(config, sessions, Arc::new(agent)));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            uploads,
        }
    }

    async fn start(&self) -> String {
        let body: Value = self
            .client
            .post(format!("{}/start", self.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["session_id"].as_str().unwrap().to_string()
    }

    async fn ask(&self, session_id: &str) -> Value {
        self.client
            .get(format!("{}/next", self.base))
            .query(&[("session_id", session_id)])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn answer(&self, form: multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}/next", self.base))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    fn upload_count(&self) -> usize {
        std::fs::read_dir(self.uploads.path()).unwrap().count()
    }

    async fn answer_text(&self, session_id: &str, text: &str) -> Value {
        let form = multipart::Form::new()
            .text("session_id", session_id.to_string())
            .text("text", text.to_string());
        self.answer(form).await.json().await.unwrap()
    }
}

/// Full walk-through of a two-field form
#[tokio::test]
async fn test_two_field_walkthrough() {
    let server = TestServer::spawn(100).await;
    let id = server.start().await;
    assert!(uuid::Uuid::parse_str(&id).is_ok());

    assert_eq!(
        server.ask(&id).await,
        json!({"question": "What is the name of the machine/tool?", "field": "toolName"})
    );
    assert_eq!(
        server.answer_text(&id, "Tractor").await,
        json!({"success": true, "data": {"toolName": "Tractor"}})
    );
    assert_eq!(
        server.ask(&id).await,
        json!({"question": "What is the category of the machine?", "field": "category"})
    );
    assert_eq!(
        server.answer_text(&id, "Harvester").await,
        json!({"success": true, "data": {"toolName": "Tractor", "category": "Harvester"}})
    );

    let done = json!({"done": true, "data": {"toolName": "Tractor", "category": "Harvester"}});
    assert_eq!(server.ask(&id).await, done);
    assert_eq!(server.answer_text(&id, "anything").await, done);
}

/// The invalid sentinel returns the pending question with an error
#[tokio::test]
async fn test_invalid_answer_repeats_question() {
    let server = TestServer::spawn(100).await;
    let id = server.start().await;

    server.ask(&id).await;
    assert_eq!(
        server.answer_text(&id, "nonsense").await,
        json!({"question": "What is the name of the machine/tool?", "error": "Invalid input"})
    );
    assert_eq!(server.ask(&id).await["field"], "toolName");
}

/// Neither text nor audio gives the missing-input error
#[tokio::test]
async fn test_missing_input() {
    let server = TestServer::spawn(100).await;
    let id = server.start().await;

    let expected = json!({"error": "Provide either audio or text"});
    let form = multipart::Form::new().text("session_id", id.clone());
    let response = server.answer(form).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>().await.unwrap(), expected);

    assert_eq!(server.answer_text(&id, "   ").await, expected);
}

/// session_id is a required form field
#[tokio::test]
async fn test_missing_session_id() {
    let server = TestServer::spawn(100).await;

    let form = multipart::Form::new().text("text", "Tractor");
    let response = server.answer(form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("session_id"));
}

/// A malformed extraction reply surfaces as a gateway error
#[tokio::test]
async fn test_malformed_extraction_is_bad_gateway() {
    let server = TestServer::spawn(100).await;
    let id = server.start().await;

    let form = multipart::Form::new()
        .text("session_id", id.clone())
        .text("text", "garbage");
    let response = server.answer(form).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].is_string());

    // Nothing was stored
    assert_eq!(server.ask(&id).await["field"], "toolName");
}

fn audio_form(session_id: &str) -> multipart::Form {
    let audio = multipart::Part::bytes(b"RIFF....WAVE".to_vec())
        .file_name("answer.wav")
        .mime_str("audio/wav")
        .unwrap();
    multipart::Form::new()
        .text("session_id", session_id.to_string())
        .text("text", "ignored when audio is present")
        .part("audio", audio)
}

/// Audio answers are transcribed and the upload is cleaned up
#[tokio::test]
async fn test_audio_answer() {
    let server = TestServer::spawn(100).await;
    let id = server.start().await;

    let body: Value = server.answer(audio_form(&id)).await.json().await.unwrap();
    assert_eq!(body, json!({"success": true, "data": {"toolName": "Harvester"}}));
    assert_eq!(server.upload_count(), 0);
}

/// A speech-to-text failure is a gateway error and still removes the upload
#[tokio::test]
async fn test_failed_transcription_removes_upload() {
    let server = TestServer::spawn_with(TestOptions {
        stt: Arc::new(FailingStt),
        ..TestOptions::default()
    })
    .await;
    let id = server.start().await;

    let response = server.answer(audio_form(&id)).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("503"));

    assert_eq!(server.upload_count(), 0);
    assert_eq!(server.ask(&id).await["field"], "toolName");
}

/// A request abandoned by the timeout layer does not leave its upload behind
#[tokio::test]
async fn test_timed_out_request_removes_upload() {
    let server = TestServer::spawn_with(TestOptions {
        timeout_secs: 1,
        stt: Arc::new(SlowStt),
        ..TestOptions::default()
    })
    .await;
    let id = server.start().await;

    let response = server.answer(audio_form(&id)).await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    let mut remaining = server.upload_count();
    for _ in 0..20 {
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        remaining = server.upload_count();
    }
    assert_eq!(remaining, 0);
}

/// GET /next without a session id uses the default session
#[tokio::test]
async fn test_default_session() {
    let server = TestServer::spawn(100).await;

    let body: Value = server
        .client
        .get(format!("{}/next", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["field"], "toolName");

    // The default session is an ordinary session id
    assert_eq!(server.answer_text("1", "Tiller").await["success"], true);
}

/// Concurrent answers on one session are applied one at a time
#[tokio::test]
async fn test_concurrent_answers_serialize() {
    let server = Arc::new(TestServer::spawn(100).await);
    let id = server.start().await;

    let first = {
        let (server, id) = (Arc::clone(&server), id.clone());
        tokio::spawn(async move { server.answer_text(&id, "Alpha").await })
    };
    let second = {
        let (server, id) = (Arc::clone(&server), id.clone());
        tokio::spawn(async move { server.answer_text(&id, "Beta").await })
    };
    first.await.unwrap();
    second.await.unwrap();

    let done = server.ask(&id).await;
    assert_eq!(done["done"], true);
    let data = done["data"].as_object().unwrap();
    assert_eq!(data.len(), 2);
    let mut values: Vec<&str> = data.values().filter_map(Value::as_str).collect();
    values.sort();
    assert_eq!(values, vec!["Alpha", "Beta"]);
}

/// Session creation fails with 503 once the store is full
#[tokio::test]
async fn test_session_capacity() {
    let server = TestServer::spawn(1).await;
    server.start().await;

    let response = server
        .client
        .post(format!("{}/start", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

/// Root, health and metrics endpoints
#[tokio::test]
async fn test_service_endpoints() {
    let server = TestServer::spawn(100).await;
    server.start().await;

    let root: Value = server
        .client
        .get(&server.base)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(root["status"], "ok");

    let health: Value = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["sessions"], 1);
    assert_eq!(health["fields"], 2);
    assert_eq!(health["model"], "echo");
    assert_eq!(health["checks"]["llm"], true);
    assert_eq!(health["checks"]["audio"], true);

    // No recorder installed in tests
    let metrics = server
        .client
        .get(format!("{}/metrics", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::NOT_FOUND);
}

/// An unreachable chat model shows up in the health report
#[tokio::test]
async fn test_health_reports_unavailable_model() {
    let server = TestServer::spawn_with(TestOptions {
        llm_available: false,
        ..TestOptions::default()
    })
    .await;

    let response = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: Value = response.json().await.unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["checks"]["llm"], false);
}

/// Responses carry CORS headers from the outermost layer
#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::spawn(100).await;

    let response = server
        .client
        .get(format!("{}/health", server.base))
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
