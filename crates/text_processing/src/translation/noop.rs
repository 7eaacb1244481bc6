use async_trait::async_trait;
use form_agent_core::{Language, Result, Translator};

/// Pass-through translator used when translation is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTranslator;

impl NoopTranslator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str, _from: Language, _to: Language) -> Result<String> {
        Ok(text.to_string())
    }

    fn supports_pair(&self, _from: Language, _to: Language) -> bool {
        true
    }

    fn name(&self) -> &str {
        "noop"
    }
}
