//! Translation module with script detection
//!
//! Supports the Translate-Think-Translate pattern: user input is brought to
//! English before the chat model sees it, and generated questions are
//! translated back into the display language.

mod detect;
mod llm;
mod noop;

pub use detect::ScriptDetector;
pub use llm::LlmTranslator;
pub use noop::NoopTranslator;
