//! Checkbox response normalization and the consent lexicon.
//!
//! Generated checkbox answers arrive in several shapes: a bare boolean, an
//! array of option values, an object of per-option truthiness, or a
//! comma-separated string. [`CheckboxResponse`] models them as a tagged
//! union with one [`normalize`](CheckboxResponse::normalize) producing the
//! canonical set of values to check.

use std::collections::BTreeSet;

use serde_json::Value;

/// Name/label substrings denoting legal consent checkboxes.
///
/// A checkbox matching this lexicon is always coerced to checked, even when
/// the generated response says otherwise. Policy, not a defect.
const CONSENT_LEXICON: &[&str] = &[
    "consent",
    "agree",
    "agreement",
    "gdpr",
    "terms",
    "privacy",
    "retention",
    "acknowledge",
];

/// Whether a checkbox name or label falls under the consent lexicon.
pub fn consent_lexicon_matches(name: &str, label: &str) -> bool {
    let name = name.to_lowercase();
    let label = label.to_lowercase();
    CONSENT_LEXICON
        .iter()
        .any(|term| name.contains(term) || label.contains(term))
}

/// The accepted shapes of a generated checkbox answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckboxResponse {
    /// `true` means check all options of the group; `false` means none.
    Bool(bool),
    /// Explicit list of option values to check.
    List(Vec<String>),
    /// Option value → truthiness map; truthy entries get checked.
    Map(Vec<(String, bool)>),
    /// Comma-separated option values.
    Csv(String),
}

impl CheckboxResponse {
    /// Classify a raw response value. Anything unrecognized is treated as a
    /// single-value CSV, which degrades to "check the matching option".
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(b) => CheckboxResponse::Bool(*b),
            Value::Array(items) => CheckboxResponse::List(
                items
                    .iter()
                    .filter_map(|v| scalar_text(v))
                    .collect(),
            ),
            Value::Object(map) => CheckboxResponse::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), is_truthy(v)))
                    .collect(),
            ),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" => CheckboxResponse::Bool(true),
                "false" | "no" => CheckboxResponse::Bool(false),
                _ => CheckboxResponse::Csv(s.clone()),
            },
            Value::Number(n) => CheckboxResponse::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::Null => CheckboxResponse::Bool(false),
        }
    }

    /// The canonical set of option values to check, given the group's
    /// available options.
    pub fn normalize(&self, available: &[String]) -> BTreeSet<String> {
        match self {
            CheckboxResponse::Bool(true) => available.iter().cloned().collect(),
            CheckboxResponse::Bool(false) => BTreeSet::new(),
            CheckboxResponse::List(values) => values.iter().cloned().collect(),
            CheckboxResponse::Map(entries) => entries
                .iter()
                .filter(|(_, truthy)| *truthy)
                .map(|(value, _)| value.clone())
                .collect(),
            CheckboxResponse::Csv(csv) => csv
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Boolean coercion for a lone checkbox: `true`, `"true"`, `"yes"`, `1`.
    pub fn as_bool(&self) -> bool {
        match self {
            CheckboxResponse::Bool(b) => *b,
            CheckboxResponse::List(values) => !values.is_empty(),
            CheckboxResponse::Map(entries) => entries.iter().any(|(_, truthy)| *truthy),
            CheckboxResponse::Csv(csv) => !csv.trim().is_empty(),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}
