//! Field schedule types
//!
//! A form is an ordered list of fields. The schedule is built once at
//! startup and shared read-only by every session.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::{Error, Result};

/// Value shape expected for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text
    #[default]
    Text,
    /// Numeric value (prices, quantities)
    Number,
    /// Calendar date, stored as `YYYY-MM-DD`
    Date,
}

/// One entry of the schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Key the extracted value is stored under
    pub key: String,
    /// Human description handed to the model
    pub description: String,
    #[serde(default)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Ordered, immutable list of fields
#[derive(Debug, Clone)]
pub struct FieldSchedule {
    fields: Arc<[FieldDescriptor]>,
}

impl FieldSchedule {
    /// Build a schedule, rejecting empty lists, blank keys and duplicate keys
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::InvalidInput(
                "field schedule must contain at least one field".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.key.trim().is_empty() {
                return Err(Error::InvalidInput("field key must not be empty".to_string()));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate field key: {}",
                    field.key
                )));
            }
        }

        Ok(Self {
            fields: fields.into(),
        })
    }

    /// Field at `index`, or `None` once the schedule is exhausted
    pub fn get(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }
}
