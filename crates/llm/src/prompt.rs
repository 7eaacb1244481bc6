//! Prompt building
//!
//! Chat messages plus a small template renderer. Templates use named
//! `{placeholder}` slots; `{{` and `}}` produce literal braces. Braces that do
//! not wrap a plain identifier are copied through untouched, so JSON examples
//! inside a template survive even without escaping.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::LlmError;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Named prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    template: String,
}

enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Slot(&'a str),
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of first appearance
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in self.segments() {
            if let Segment::Slot(name) = segment {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Fail unless every name in `required` appears as a placeholder
    pub fn require(&self, required: &[&str]) -> Result<(), LlmError> {
        let present = self.placeholders();
        for name in required {
            if !present.contains(name) {
                return Err(LlmError::Prompt(format!(
                    "template '{}' is missing placeholder {{{}}}",
                    self.name, name
                )));
            }
        }
        Ok(())
    }

    /// Substitute `vars` into the template
    ///
    /// Values are inserted verbatim; a placeholder without a value is an error.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, LlmError> {
        let mut out = String::with_capacity(self.template.len() + 64);

        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Brace(c) => out.push(c),
                Segment::Slot(name) => {
                    let value = vars
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            LlmError::Prompt(format!(
                                "no value for placeholder {{{}}} in template '{}'",
                                name, self.name
                            ))
                        })?;
                    out.push_str(value);
                }
            }
        }

        Ok(out)
    }

    fn segments(&self) -> Vec<Segment<'_>> {
        let src = self.template.as_str();
        let bytes = src.as_bytes();
        let mut segments = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    segments.push(Segment::Literal(&src[literal_start..i]));
                    segments.push(Segment::Brace('{'));
                    i += 2;
                    literal_start = i;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    segments.push(Segment::Literal(&src[literal_start..i]));
                    segments.push(Segment::Brace('}'));
                    i += 2;
                    literal_start = i;
                }
                b'{' => match src[i + 1..].find('}') {
                    Some(offset) if is_identifier(&src[i + 1..i + 1 + offset]) => {
                        segments.push(Segment::Literal(&src[literal_start..i]));
                        segments.push(Segment::Slot(&src[i + 1..i + 1 + offset]));
                        i += offset + 2;
                        literal_start = i;
                    }
                    _ => i += 1,
                },
                _ => i += 1,
            }
        }

        segments.push(Segment::Literal(&src[literal_start..]));
        segments
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
