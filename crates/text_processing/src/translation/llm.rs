//! Prompt-driven translation through a chat model

use async_trait::async_trait;
use form_agent_core::{Error, Language, Result, Translator};
use form_agent_llm::{LlmBackend, LlmError, PromptTemplate};
use std::sync::Arc;

/// Translates to and from English with two prompt templates.
///
/// Both templates take `{language}` (the non-English side) and `{text}`.
pub struct LlmTranslator {
    backend: Arc<dyn LlmBackend>,
    to_english: PromptTemplate,
    from_english: PromptTemplate,
}

impl LlmTranslator {
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        to_english: PromptTemplate,
        from_english: PromptTemplate,
    ) -> std::result::Result<Self, LlmError> {
        to_english.require(&["language", "text"])?;
        from_english.require(&["language", "text"])?;

        Ok(Self {
            backend,
            to_english,
            from_english,
        })
    }

    fn prompt_for(&self, text: &str, from: Language, to: Language) -> Result<String> {
        let (template, other) = if to.is_english() {
            (&self.to_english, from)
        } else if from.is_english() {
            (&self.from_english, to)
        } else {
            return Err(Error::UnsupportedLanguage(format!(
                "{} -> {}",
                from.code(),
                to.code()
            )));
        };

        template
            .render(&[("language", other.name()), ("text", text)])
            .map_err(|e| Error::Translation(e.to_string()))
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, text: &str, from: Language, to: Language) -> Result<String> {
        if from == to || text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let prompt = self.prompt_for(text, from, to)?;
        let translated = self
            .backend
            .complete(&prompt)
            .await
            .map_err(|e| Error::Translation(e.to_string()))?;

        tracing::debug!(
            from = from.code(),
            to = to.code(),
            model = self.backend.model_name(),
            "Translated text"
        );

        Ok(translated)
    }

    fn supports_pair(&self, from: Language, to: Language) -> bool {
        from == to || from.is_english() || to.is_english()
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_agent_llm::{Completion, Message};
    use parking_lot::Mutex;

    /// Records prompts and replies with a fixed string
    struct RecordingBackend {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingBackend {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmBackend for RecordingBackend {
        async fn chat(&self, messages: &[Message]) -> std::result::Result<Completion, LlmError> {
            self.prompts.lock().push(messages[0].content.clone());
            Ok(Completion::stop(self.reply.clone()))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn translator(backend: Arc<RecordingBackend>) -> LlmTranslator {
        LlmTranslator::new(
            backend,
            PromptTemplate::new("to_english", "To English from {language}: {text}"),
            PromptTemplate::new("from_english", "From English to {language}: {text}"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_to_english_prompt() {
        let backend = RecordingBackend::new(" My tractor \n");
        let result = translator(backend.clone())
            .translate("मेरो ट्र्याक्टर", Language::Nepali, Language::English)
            .await
            .unwrap();

        assert_eq!(result, "My tractor");
        assert_eq!(
            backend.prompts.lock()[0],
            "To English from Nepali: मेरो ट्र्याक्टर"
        );
    }

    #[tokio::test]
    async fn test_from_english_prompt() {
        let backend = RecordingBackend::new("मेसिनको नाम के हो?");
        let result = translator(backend.clone())
            .translate("What is the machine name?", Language::English, Language::Nepali)
            .await
            .unwrap();

        assert_eq!(result, "मेसिनको नाम के हो?");
        assert!(backend.prompts.lock()[0].starts_with("From English to Nepali"));
    }

    #[tokio::test]
    async fn test_same_language_skips_model() {
        let backend = RecordingBackend::new("unused");
        let result = translator(backend.clone())
            .translate("Tractor", Language::English, Language::English)
            .await
            .unwrap();

        assert_eq!(result, "Tractor");
        assert!(backend.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_non_english_pair_unsupported() {
        let t = translator(RecordingBackend::new("x"));
        assert!(!t.supports_pair(Language::Nepali, Language::Hindi));
        let err = t
            .translate("नमस्ते", Language::Nepali, Language::Hindi)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_template_without_text_rejected() {
        let result = LlmTranslator::new(
            RecordingBackend::new("x"),
            PromptTemplate::new("to_english", "Translate from {language}"),
            PromptTemplate::new("from_english", "{language}: {text}"),
        );
        assert!(result.is_err());
    }
}
