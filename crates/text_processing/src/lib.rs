//! Text processing for user answers
//!
//! - Script-based language detection
//! - Prompt-driven translation through a chat model
//! - Input normalization (anything the user typed becomes English)

pub mod normalizer;
pub mod translation;

pub use normalizer::{InputNormalizer, NormalizedText};
pub use translation::{LlmTranslator, NoopTranslator, ScriptDetector};
