//! Response generation: field inventory + profile + job context in,
//! per-field answers out.
//!
//! The completion service is invoked once per attempt in strict-JSON mode.
//! An unparsable or empty result is a [`GenerationError`] and fails the
//! attempt; there is no silent default. Validation is a separate pass that
//! reports but never mutates.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use formpilot_protocols::{
    CompletionOptions, CompletionProvider, Field, FieldType, GenerationError, JobContext, Profile,
    ResponseSet, ValidationReport,
};

use crate::driver::match_option;

#[cfg(test)]
#[path = "generator_tests.rs"]
mod tests;

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Deadline for the completion call; expiry is a generation failure.
    pub timeout: Duration,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.2,
            timeout: Duration::from_secs(90),
        }
    }
}

pub struct ResponseGenerator {
    provider: Arc<dyn CompletionProvider>,
    options: GeneratorOptions,
}

impl ResponseGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, options: GeneratorOptions) -> Self {
        Self { provider, options }
    }

    /// Produce one answer per field from the profile and job context.
    pub async fn generate(
        &self,
        fields: &[Field],
        profile: &Profile,
        job: &JobContext,
    ) -> Result<ResponseSet, GenerationError> {
        let prompt = build_prompt(fields, profile, job);
        debug!(provider = self.provider.id(), fields = fields.len(), "Generating responses");

        let options = CompletionOptions::json()
            .with_max_tokens(self.options.max_tokens)
            .with_temperature(self.options.temperature)
            .with_timeout(self.options.timeout);

        let raw = self.provider.generate(&prompt, &options).await?;
        parse_responses(&raw)
    }

    /// Check the responses against the extraction. Reports errors (which
    /// block the success classification) and warnings; never mutates the
    /// response set.
    pub fn validate(responses: &ResponseSet, fields: &[Field]) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut seen_required: Vec<&str> = Vec::new();

        for field in fields {
            let value = responses.get(&field.name);

            if field.required && !seen_required.contains(&field.name.as_str()) {
                seen_required.push(&field.name);
                if value.map_or(true, is_empty_value) {
                    // Exactly one error per missing required field.
                    report.error(&field.name, "Required field is empty");
                    continue;
                }
            }

            let Some(value) = value else { continue };
            if is_empty_value(value) {
                continue;
            }

            match field.field_type {
                FieldType::Email => {
                    if let Some(text) = value.as_str() {
                        if !email_re().is_match(text) {
                            report.error(&field.name, "Not a valid email address");
                        }
                    }
                }
                FieldType::Url => {
                    if let Some(text) = value.as_str() {
                        if !url_re().is_match(text) {
                            report.error(&field.name, "Not a valid URL");
                        }
                    }
                }
                FieldType::Tel => {
                    if let Some(text) = value.as_str() {
                        if !phone_re().is_match(text) {
                            report.error(&field.name, "Not a valid phone number");
                        }
                    }
                }
                FieldType::Number => {
                    let coercible = match value {
                        Value::Number(_) => true,
                        Value::String(s) => s.trim().parse::<f64>().is_ok(),
                        _ => false,
                    };
                    if !coercible {
                        report.error(&field.name, "Not coercible to a number");
                    }
                }
                FieldType::Select => {
                    // Lenient on purpose: anything the fill-time match
                    // ladder resolves is acceptable here.
                    if let Some(text) = value.as_str() {
                        if match_option(&field.options, text).is_none() {
                            report.error(&field.name, "Value matches no select option");
                        }
                    }
                }
                _ => {}
            }

            if let (Some(max), Some(text)) = (field.max_length, value.as_str()) {
                // Character count, not byte length; maxlength is in characters.
                let length = text.chars().count();
                if length > max as usize {
                    report.warning(
                        &field.name,
                        format!("Value length {} exceeds max length {}", length, max),
                    );
                }
            }
        }

        report
    }
}

/// One line per field so the model sees name, type, label, required flag
/// and the allowed options.
fn build_prompt(fields: &[Field], profile: &Profile, job: &JobContext) -> String {
    let mut lines = Vec::with_capacity(fields.len());
    for field in fields {
        let mut line = format!(
            "- name: {} | type: {} | label: {}{}",
            field.name,
            field.field_type.attr(),
            if field.label.is_empty() { "(none)" } else { &field.label },
            if field.required { " | required" } else { "" },
        );
        if !field.options.is_empty() {
            let options: Vec<&str> = field.options.iter().map(|o| o.value.as_str()).collect();
            line.push_str(&format!(" | options: [{}]", options.join(", ")));
        }
        lines.push(line);
    }

    format!(
        "You are filling a job application form on behalf of a candidate.\n\
         \n\
         Job: {title} at {company}\n\
         {description}\n\
         \n\
         Candidate profile:\n{profile}\n\
         \n\
         Form fields:\n{fields}\n\
         \n\
         Answer every field you can from the profile. For select/radio \
         fields pick one of the listed options. For checkbox fields answer \
         true/false or a list of option values. Respond with a single JSON \
         object keyed by field name, no markdown fences, no commentary.",
        title = job.title,
        company = job.company,
        description = job.description,
        profile = serde_json::to_string_pretty(profile.as_value()).unwrap_or_default(),
        fields = lines.join("\n"),
    )
}

/// Parse the model output into a response set, stripping markdown fences
/// defensively even though the contract forbids them.
fn parse_responses(raw: &str) -> Result<ResponseSet, GenerationError> {
    let trimmed = strip_fences(raw);
    if trimmed.is_empty() {
        return Err(GenerationError::Empty);
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| GenerationError::Unparsable(format!("{}: {}", e, truncate(trimmed, 200))))?;

    ResponseSet::from_value(value).ok_or_else(|| {
        warn!("Model output parsed but was not an object");
        GenerationError::Unparsable("expected a JSON object keyed by field name".to_string())
    })
}

pub(crate) fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn email_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"))
}

fn url_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://\S+$").expect("url regex"))
}

fn phone_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+]?[\d\s().-]{7,20}$").expect("phone regex"))
}
