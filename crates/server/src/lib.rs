//! Form Agent Server
//!
//! HTTP surface for the conversational form agent: session start, ask and
//! answer endpoints, health and Prometheus metrics.

pub mod http;
pub mod metrics;
pub mod session;
pub mod state;
pub mod uploads;

pub use http::create_router;
pub use metrics::{init_metrics, record_error, record_step};
pub use session::{Session, SessionManager};
pub use state::AppState;
pub use uploads::{SavedUpload, UploadStore};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use form_agent_agent::AgentError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session capacity reached: {0}")]
    Capacity(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Agent(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            // Audio sent while speech-to-text is disabled
            ServerError::Agent(AgentError::Configuration(_)) => StatusCode::BAD_REQUEST,
            ServerError::Agent(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Capacity(_) => "capacity",
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Upload(_) => "upload",
            ServerError::Agent(AgentError::Llm(_)) => "llm",
            ServerError::Agent(AgentError::Translation(_)) => "translation",
            ServerError::Agent(AgentError::Transcription(_)) => "transcription",
            ServerError::Agent(AgentError::Extraction(_)) => "extraction",
            ServerError::Agent(AgentError::Configuration(_)) => "configuration",
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        err.status()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::warn!(error = %self, kind = self.kind(), "Request rejected");
        }
        record_error(self.kind());

        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_agent_llm::LlmError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServerError::Capacity("full".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServerError::InvalidRequest("no session".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(AgentError::Extraction("bad".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServerError::from(AgentError::Llm(LlmError::Timeout)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServerError::from(AgentError::Configuration("stt".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::Upload("disk full".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_local_llm_failures_are_internal() {
        let prompt = ServerError::from(AgentError::Llm(LlmError::Prompt(
            "no value for placeholder {field}".into(),
        )));
        assert_eq!(prompt.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(prompt.kind(), "llm");

        let config = ServerError::from(AgentError::Llm(LlmError::Configuration("no key".into())));
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let truncated = ServerError::from(AgentError::Llm(LlmError::Truncated("m".into())));
        assert_eq!(truncated.status(), StatusCode::BAD_GATEWAY);
    }
}
