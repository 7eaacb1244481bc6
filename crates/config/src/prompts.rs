//! Prompt template texts
//!
//! Templates use named `{placeholder}`s; `{{` and `}}` render literal braces.
//! Every template can be overridden under the `prompts` config section.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const QUESTION_TEMPLATE: &str = "You are a form assistant.
Ask ONLY about the given field.
Do NOT explain.
Conversation history:
{history}

Field:
{field}

Return only the question.";

const EXTRACTION_TEMPLATE: &str = "You are a strict validation and extraction engine.

Return ONLY:
0
OR
{{\"value\": \"extracted_value\"}}

Question:
{question}

Field:
{field}

User input:
{user_input}";

const TO_ENGLISH_TEMPLATE: &str = "Translate the following {language} text to English:
{text}";

const FROM_ENGLISH_TEMPLATE: &str = "Translate the given English text to {language}:
{text}
Return only the translated text.
No explanations.
No additional text.";

/// Prompt templates for every model call the agent makes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Question generation; placeholders: `field`, `history`
    #[serde(default = "default_question")]
    pub question: String,

    /// Value extraction; placeholders: `question`, `field`, `user_input`
    #[serde(default = "default_extraction")]
    pub extraction: String,

    /// User language to English; placeholders: `language`, `text`
    #[serde(default = "default_to_english")]
    pub to_english: String,

    /// English to display language; placeholders: `language`, `text`
    #[serde(default = "default_from_english")]
    pub from_english: String,
}

fn default_question() -> String {
    QUESTION_TEMPLATE.to_string()
}

fn default_extraction() -> String {
    EXTRACTION_TEMPLATE.to_string()
}

fn default_to_english() -> String {
    TO_ENGLISH_TEMPLATE.to_string()
}

fn default_from_english() -> String {
    FROM_ENGLISH_TEMPLATE.to_string()
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            question: default_question(),
            extraction: default_extraction(),
            to_english: default_to_english(),
            from_english: default_from_english(),
        }
    }
}

impl PromptsConfig {
    /// Check every template still carries the placeholders the agent fills in
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&str, &str, &[&str]); 4] = [
            ("prompts.question", &self.question, &["field", "history"]),
            (
                "prompts.extraction",
                &self.extraction,
                &["question", "field", "user_input"],
            ),
            ("prompts.to_english", &self.to_english, &["language", "text"]),
            ("prompts.from_english", &self.from_english, &["language", "text"]),
        ];

        for (field, template, required) in checks {
            for name in required {
                if !has_slot(template, name) {
                    return Err(ConfigError::InvalidValue {
                        field: field.to_string(),
                        message: format!("template is missing the {{{}}} placeholder", name),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Whether `{name}` appears as a slot; `{{` and `}}` are literal braces
fn has_slot(template: &str, name: &str) -> bool {
    let slot = format!("{{{}}}", name);
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => i += 2,
            b'{' if template[i..].starts_with(&slot) => return true,
            _ => i += 1,
        }
    }
    false
}
