//! Input normalization
//!
//! Typed answers may arrive in the user's own language. The normalizer
//! detects the language and, unless it is already English, translates the
//! text so extraction always works on English input.

use form_agent_core::{Language, LanguageDetector, Result, Translator};
use std::sync::Arc;

/// Normalized answer text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// English text handed to extraction
    pub text: String,
    /// Language the input was detected as
    pub detected: Language,
    /// Whether a translation call was made
    pub translated: bool,
}

/// Detect-then-translate pipeline for typed input
#[derive(Clone)]
pub struct InputNormalizer {
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
}

impl InputNormalizer {
    pub fn new(detector: Arc<dyn LanguageDetector>, translator: Arc<dyn Translator>) -> Self {
        Self {
            detector,
            translator,
        }
    }

    pub async fn normalize(&self, text: &str) -> Result<NormalizedText> {
        let detected = self.detector.detect(text);

        if detected.is_english() {
            return Ok(NormalizedText {
                text: text.to_string(),
                detected,
                translated: false,
            });
        }

        let english = self
            .translator
            .translate(text, detected, Language::English)
            .await?;

        tracing::debug!(
            detector = self.detector.name(),
            translator = self.translator.name(),
            language = detected.code(),
            "Normalized input to English"
        );

        Ok(NormalizedText {
            text: english,
            detected,
            translated: true,
        })
    }
}
