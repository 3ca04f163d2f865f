//! Per-attempt answer and outcome types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

/// Generated answers, keyed by field name.
///
/// Values are scalars, lists or booleans exactly as the model produced them;
/// normalization happens at fill time, never here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseSet(BTreeMap<String, Value>);

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a parsed JSON object. Returns `None` for non-object values.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map.into_iter().collect())),
            _ => None,
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// One validation finding, attached to a field by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating a [`ResponseSet`] against an extraction.
///
/// Errors block the success classification; warnings are informational only.
/// Validation never mutates the responses it inspects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    pub fn warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(field, message));
    }
}

/// A single field's fill failure, isolated from the rest of the attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillFailure {
    pub field: String,
    pub message: String,
    /// Set for resume-upload style failures, which the success
    /// classification tolerates.
    pub file_related: bool,
}

impl FillFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            file_related: false,
        }
    }

    pub fn file_related(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            file_related: true,
        }
    }
}

/// Aggregate outcome of one fill pass over an extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillReport {
    /// Names of fields that were filled, in fill order.
    pub filled: Vec<String>,
    pub failures: Vec<FillFailure>,
}

impl FillReport {
    pub fn attempted(&self) -> usize {
        self.filled.len() + self.failures.len()
    }

    /// Fraction of attempted fields that succeeded. Zero attempts yield 0.0.
    pub fn fill_rate(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            return 0.0;
        }
        self.filled.len() as f64 / attempted as f64
    }

    /// Success classification: at least one field filled, and either no
    /// failures at all or a fill rate above `threshold` with every
    /// remaining failure file-related.
    pub fn is_success(&self, threshold: f64) -> bool {
        if self.filled.is_empty() {
            return false;
        }
        if self.failures.is_empty() {
            return true;
        }
        self.fill_rate() >= threshold && self.failures.iter().all(|f| f.file_related)
    }

    pub fn merge(&mut self, other: FillReport) {
        self.filled.extend(other.filled);
        self.failures.extend(other.failures);
    }
}
