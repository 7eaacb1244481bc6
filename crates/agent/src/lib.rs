//! Conversational form-filling agent
//!
//! Features:
//! - Linear walk over a fixed field schedule (ask, then answer)
//! - Question generation and value extraction through a chat model
//! - Typed and spoken answers, normalized to English
//! - Strict parsing of the extraction reply

pub mod agent;
pub mod extraction;
pub mod state;

pub use agent::{FormAgent, FormAgentBuilder, FormPrompts, StepOutcome, UserInput};
pub use extraction::{coerce_value, parse_extraction, Extraction};
pub use state::FormState;

use form_agent_llm::LlmError;
use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    /// The extraction reply was neither the invalid sentinel nor `{"value": ...}`
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    /// True when a hosted model or service failed, as opposed to local
    /// setup such as a bad template or a disabled backend
    pub fn is_upstream(&self) -> bool {
        match self {
            AgentError::Llm(e) => e.is_upstream(),
            AgentError::Translation(_)
            | AgentError::Transcription(_)
            | AgentError::Extraction(_) => true,
            AgentError::Configuration(_) => false,
        }
    }
}
