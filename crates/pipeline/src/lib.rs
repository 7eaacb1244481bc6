//! Speech input pipeline
//!
//! Turns uploaded recordings into English text through a hosted Whisper
//! service.

pub mod stt;

pub use stt::{WhisperHttpConfig, WhisperHttpStt};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("STT error: {0}")]
    Stt(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout")]
    Timeout,

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipelineError::Timeout
        } else {
            PipelineError::Network(err.to_string())
        }
    }
}

impl From<PipelineError> for form_agent_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Io(msg) => form_agent_core::Error::Stt(format!("IO error: {}", msg)),
            other => form_agent_core::Error::Stt(other.to_string()),
        }
    }
}
