//! Per-session form progress

use serde::Serialize;
use serde_json::{Map, Value};

/// Progress of one user through the field schedule.
///
/// Fields are private so the cursor, the collected data and the history can
/// only move together: `index` always equals `data.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormState {
    index: usize,
    data: Map<String, Value>,
    history: Vec<Value>,
    last_question: Option<String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position in the field schedule
    pub fn index(&self) -> usize {
        self.index
    }

    /// Collected values in field order
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Extracted values in the order they were accepted
    pub fn history(&self) -> &[Value] {
        &self.history
    }

    /// English question awaiting an answer, if any
    pub fn last_question(&self) -> Option<&str> {
        self.last_question.as_deref()
    }

    pub fn is_complete(&self, field_count: usize) -> bool {
        self.index >= field_count
    }

    pub(crate) fn set_question(&mut self, question: String) {
        self.last_question = Some(question);
    }

    /// Store the value for the current field and move to the next one
    pub(crate) fn record_answer(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value.clone());
        self.history.push(value);
        self.index += 1;
        self.last_question = None;
    }
}
