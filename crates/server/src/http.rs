//! HTTP Endpoints
//!
//! REST API for the form agent.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Json, Multipart, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use form_agent_agent::{StepOutcome, UserInput};

use crate::metrics::{metrics_handler, record_step};
use crate::state::AppState;
use crate::ServerError;

/// Room for the non-file multipart fields on top of the audio limit
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = &state.config;
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    let body_limit = config.uploads.max_bytes + FORM_OVERHEAD_BYTES;
    let timeout = Duration::from_secs(config.server.timeout_seconds);

    Router::new()
        .route("/", get(root))
        .route("/start", post(start_session))
        .route("/next", get(next_question).post(submit_answer))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer
///
/// - `enabled == false`: every origin is allowed
/// - no usable origins configured: localhost:3000 only
/// - otherwise the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Form agent backend is running",
        "status": "ok",
        "cors": "enabled",
    }))
}

/// `POST /start`
async fn start_session(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let session = state.sessions.create()?;
    Ok(Json(json!({ "session_id": session.id })))
}

#[derive(Debug, Deserialize)]
struct NextQuery {
    #[serde(default = "default_session_id")]
    session_id: String,
}

fn default_session_id() -> String {
    "1".to_string()
}

/// `GET /next`: question for the current field
async fn next_question(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
) -> Result<Json<StepOutcome>, ServerError> {
    state.process_step(&query.session_id, None).await.map(Json)
}

struct AudioUpload {
    file_name: Option<String>,
    bytes: Bytes,
}

/// Parts of the answer form
#[derive(Default)]
struct AnswerForm {
    session_id: Option<String>,
    text: Option<String>,
    audio: Option<AudioUpload>,
}

impl AnswerForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ServerError> {
        let mut form = AnswerForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "session_id" => form.session_id = Some(field.text().await.map_err(multipart_error)?),
                "text" => form.text = Some(field.text().await.map_err(multipart_error)?),
                "audio" => {
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    // Browsers send an empty part when no file was picked
                    if !bytes.is_empty() {
                        form.audio = Some(AudioUpload { file_name, bytes });
                    }
                }
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ServerError {
    ServerError::InvalidRequest(err.body_text())
}

/// `POST /next`: answer for the current field
async fn submit_answer(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StepOutcome>, ServerError> {
    let form = AnswerForm::read(&mut multipart).await?;

    let session_id = form
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("session_id is required".to_string()))?;

    // The guard deletes the file when this handler returns or is dropped
    let saved = match &form.audio {
        Some(upload) => Some(
            state
                .uploads
                .save(upload.file_name.as_deref(), &upload.bytes)
                .await?,
        ),
        None => None,
    };
    let audio_path = saved.as_ref().map(|upload| upload.path().to_path_buf());

    let Some(input) = UserInput::from_parts(form.text, audio_path) else {
        record_step("answer", "missing_input", Duration::ZERO);
        return Ok(Json(StepOutcome::missing_input()));
    };

    let result = state.process_step(&session_id, Some(input)).await;

    if let Some(upload) = saved {
        upload.discard();
    }

    result.map(Json)
}

/// Health check endpoint
///
/// Reports `degraded` (still 200) when the chat model endpoint does not answer.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let llm_available = state.agent.model_available().await;
    let status = if llm_available { "healthy" } else { "degraded" };

    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "sessions": state.sessions.count(),
            "fields": state.agent.schedule().len(),
            "model": state.agent.model_name(),
            "checks": {
                "llm": llm_available,
                "audio": state.agent.accepts_audio(),
                "translation": state.config.translation.enabled,
                "metrics": state.metrics.is_some(),
            }
        })),
    )
}
