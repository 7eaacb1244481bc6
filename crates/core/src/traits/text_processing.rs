//! Text processing traits

use crate::{Language, Result};
use async_trait::async_trait;

/// Translation interface
///
/// Implementations:
/// - `LlmTranslator` - prompt-driven translation through a chat model
/// - `NoopTranslator` - pass-through (translation disabled)
///
/// # Example
///
/// ```ignore
/// let english = translator.translate(
///     "मेरो ट्र्याक्टर",
///     Language::Nepali,
///     Language::English
/// ).await?;
/// // "My tractor"
/// ```
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    /// Translate text between languages
    ///
    /// # Arguments
    /// * `text` - Text to translate
    /// * `from` - Source language
    /// * `to` - Target language
    ///
    /// # Returns
    /// Translated text
    async fn translate(&self, text: &str, from: Language, to: Language) -> Result<String>;

    /// Check if a language pair is supported
    fn supports_pair(&self, from: Language, to: Language) -> bool;

    /// Translator name for logging
    fn name(&self) -> &str;
}

/// Language detection strategy
///
/// Kept separate from `Translator` so a stricter detector can replace the
/// script heuristic without touching the orchestration code.
pub trait LanguageDetector: Send + Sync + 'static {
    /// Language `text` is written in
    fn detect(&self, text: &str) -> Language;

    fn name(&self) -> &str;
}
