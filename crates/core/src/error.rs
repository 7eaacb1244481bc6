//! Shared error type for the core traits

use thiserror::Error;

/// Errors surfaced through the core backend traits
#[derive(Error, Debug)]
pub enum Error {
    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Speech-to-text error: {0}")]
    Stt(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
