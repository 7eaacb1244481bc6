//! Core traits for pluggable backends
//!
//! - `SpeechToText`: audio upload to text
//! - `Translator`: text between languages
//! - `LanguageDetector`: which language a piece of text is written in

mod speech;
mod text_processing;

pub use speech::SpeechToText;
pub use text_processing::{LanguageDetector, Translator};
