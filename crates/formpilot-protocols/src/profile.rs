//! Candidate profile and job context.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Nested candidate data consumed by the template interpolator.
///
/// The canonical shape is:
///
/// ```json
/// {
///   "personal_info": { "first_name": "...", "email": "...", ... },
///   "common_answers": { "work_authorization": "...", ... },
///   "resume_path": "/path/to/resume.pdf"
/// }
/// ```
///
/// Arbitrary additional nesting is allowed; lookups use dotted paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Value);

impl Profile {
    pub fn new(data: Value) -> Self {
        Self(data)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Resolve a dotted path (`personal_info.email`) against the nested data.
    /// Only object traversal is supported; a miss at any segment yields `None`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut current = &self.0;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Resolve a dotted path to a display string. Non-string scalars are
    /// rendered with their JSON representation; objects and arrays are not
    /// usable as field values and yield `None`.
    pub fn lookup_string(&self, path: &str) -> Option<String> {
        match self.lookup(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The personal-info dictionary, if present.
    pub fn personal_info(&self) -> Option<&serde_json::Map<String, Value>> {
        self.0.get("personal_info")?.as_object()
    }

    /// The common-answers dictionary, if present.
    pub fn common_answers(&self) -> Option<&serde_json::Map<String, Value>> {
        self.0.get("common_answers")?.as_object()
    }

    /// Local path of the resume file, required by upload steps.
    pub fn resume_path(&self) -> Option<&str> {
        self.0.get("resume_path")?.as_str()
    }
}

/// Context about the position being applied for, fed to the generator prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobContext {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub description: String,
}
