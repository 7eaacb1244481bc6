//! Transcription result

use serde::{Deserialize, Serialize};

/// Text recognized from an audio upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Recognized (or translated) text
    pub text: String,
    /// Language tag of the spoken audio as reported by the service
    pub language: String,
    /// Audio duration in seconds, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f32>,
}

impl Transcript {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            duration_secs: None,
        }
    }
}
