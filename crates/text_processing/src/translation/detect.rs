//! Script-based language detection

use form_agent_core::{Language, LanguageDetector, Script};

/// Maps "contains any character of `script`" to `language`, otherwise English.
///
/// The scan stops at the first matching character.
#[derive(Debug, Clone, Copy)]
pub struct ScriptDetector {
    script: Script,
    language: Language,
}

impl ScriptDetector {
    pub fn new(script: Script, language: Language) -> Self {
        Self { script, language }
    }

    /// Detector for a language, using that language's script
    pub fn for_language(language: Language) -> Self {
        Self::new(language.script(), language)
    }
}

impl Default for ScriptDetector {
    fn default() -> Self {
        Self::for_language(Language::Nepali)
    }
}

impl LanguageDetector for ScriptDetector {
    fn detect(&self, text: &str) -> Language {
        if self.script.appears_in(text) {
            self.language
        } else {
            Language::English
        }
    }

    fn name(&self) -> &str {
        "script"
    }
}
