//! Template interpolation between literal values and profile-relative
//! `{{path}}` markers.
//!
//! Forward substitution happens at replay time, immediately before each
//! step's action. Reverse mapping happens once, when a successful adaptive
//! run is recorded. Both directions are pure functions of (input, profile).

use regex::Regex;
use serde_json::Value;

use formpilot_protocols::Profile;

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;

/// Marker stored in upload steps in place of the literal resume path, so a
/// recipe recorded with one candidate replays with another's file.
pub const RESUME_PATH_MARKER: &str = "{{resume_path}}";

pub struct TemplateInterpolator {
    marker: Regex,
}

impl Default for TemplateInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateInterpolator {
    pub fn new() -> Self {
        Self {
            // Dotted identifier paths only; anything else is not a marker.
            marker: Regex::new(r"\{\{\s*([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)\s*\}\}")
                .expect("marker regex is valid"),
        }
    }

    /// Replace every `{{a.b.c}}` marker with the profile value at that
    /// path. An unresolved path leaves its marker untouched: a missing
    /// value must not corrupt an otherwise-valid step.
    pub fn interpolate(&self, template: &str, profile: &Profile) -> String {
        self.marker
            .replace_all(template, |caps: &regex::Captures<'_>| {
                let path = &caps[1];
                profile
                    .lookup_string(path)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Map a recorded literal back to a marker, scanning exact matches over
    /// personal info, then common answers, then the resume path. An
    /// unmatched literal is stored verbatim.
    pub fn reverse(&self, literal: &str, profile: &Profile) -> String {
        if let Some(info) = profile.personal_info() {
            if let Some(key) = Self::exact_match(info, literal) {
                return format!("{{{{personal_info.{}}}}}", key);
            }
        }
        if let Some(answers) = profile.common_answers() {
            if let Some(key) = Self::exact_match(answers, literal) {
                return format!("{{{{common_answers.{}}}}}", key);
            }
        }
        if profile.resume_path() == Some(literal) {
            return RESUME_PATH_MARKER.to_string();
        }
        literal.to_string()
    }

    /// Whether a stored step value still contains unexpanded markers.
    pub fn has_marker(&self, value: &str) -> bool {
        self.marker.is_match(value)
    }

    fn exact_match<'a>(
        dict: &'a serde_json::Map<String, Value>,
        literal: &str,
    ) -> Option<&'a str> {
        dict.iter()
            .find(|(_, v)| Self::value_text(v).as_deref() == Some(literal))
            .map(|(k, _)| k.as_str())
    }

    fn value_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
