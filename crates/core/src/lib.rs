//! Core traits and types for the form agent
//!
//! This crate provides foundational types used across all other crates:
//! - Field schedule types (what the agent collects, in which order)
//! - Language and script definitions
//! - Core traits for pluggable backends (STT, translation, language detection)
//! - Error types

pub mod error;
pub mod form;
pub mod language;
pub mod traits;
pub mod transcript;

pub use error::{Error, Result};
pub use form::{FieldDescriptor, FieldKind, FieldSchedule};
pub use language::{Language, Script};
pub use transcript::Transcript;

pub use traits::{LanguageDetector, SpeechToText, Translator};
