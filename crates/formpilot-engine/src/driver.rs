//! The form driver: realizes (field, value) assignments as DOM mutations.
//!
//! Each field's fill is individually wrapped: one failure is recorded by
//! field name and the pass continues. Alongside the [`FillReport`] the
//! driver emits the step log a successful run is recorded from.

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tracing::{debug, warn};

use formpilot_protocols::{
    BrowserError, Extraction, Field, FieldOption, FieldType, FillError, FillFailure, FillReport,
    PageHandle, ResponseSet, Step, StepAction,
};

use crate::checkbox::{consent_lexicon_matches, CheckboxResponse};

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;

/// Driver knobs. Pacing is a human-pacing policy, not a correctness
/// requirement; `pacing_ms: None` is a valid no-op.
#[derive(Debug, Clone)]
pub struct FillOptions {
    /// Jitter band between fields, milliseconds.
    pub pacing_ms: Option<(u64, u64)>,
    /// Local resume file used by upload fields.
    pub resume_path: Option<PathBuf>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            pacing_ms: Some((150, 450)),
            resume_path: None,
        }
    }
}

pub struct FormDriver {
    options: FillOptions,
}

impl FormDriver {
    pub fn new(options: FillOptions) -> Self {
        Self { options }
    }

    /// Apply the response set to the extraction, field by field.
    ///
    /// Returns the report plus the replayable step log of everything that
    /// was actually applied.
    pub async fn fill(
        &self,
        page: &dyn PageHandle,
        extraction: &Extraction,
        responses: &ResponseSet,
    ) -> (FillReport, Vec<Step>) {
        let mut report = FillReport::default();
        let mut steps = Vec::new();

        for field in &extraction.fields {
            let response = responses.get(&field.name);

            // Consent checkboxes are filled even without a generated answer.
            let forced_consent = field.field_type == FieldType::Checkbox
                && consent_lexicon_matches(&field.name, &field.label);
            if response.is_none() && !forced_consent {
                continue;
            }

            let value = response.cloned().unwrap_or(Value::Bool(true));
            match self.fill_field(page, field, &value).await {
                Ok(mut field_steps) => {
                    debug!(field = %field.name, "Filled");
                    report.filled.push(field.name.clone());
                    steps.append(&mut field_steps);
                }
                Err(e) => {
                    warn!(field = %field.name, "Fill failed: {}", e);
                    let mut failure = FillFailure::new(&field.name, e.to_string());
                    failure.file_related = e.is_file_related();
                    report.failures.push(failure);
                }
            }

            self.pace().await;
        }

        (report, steps)
    }

    /// Fill exactly one field. Used by the pass above and by the single
    /// recovery retry.
    pub async fn fill_field(
        &self,
        page: &dyn PageHandle,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<Step>, FillError> {
        match field.field_type {
            FieldType::Select => self.fill_select(page, field, value).await,
            FieldType::Checkbox => self.fill_checkbox(page, field, value).await,
            FieldType::Radio => self.fill_radio(page, field, value).await,
            FieldType::File => self.fill_file(page, field).await,
            _ => self.fill_text(page, field, value).await,
        }
    }

    async fn fill_text(
        &self,
        page: &dyn PageHandle,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<Step>, FillError> {
        let text = scalar_string(value).ok_or_else(|| FillError::UnusableValue {
            field: field.name.clone(),
            message: format!("expected a scalar, got {}", value),
        })?;
        let selector = apply_first(field, &selector_chain(field, None), |sel| {
            let text = text.clone();
            async move { page.set_value(&sel, &text).await }
        })
        .await?;

        Ok(vec![Step::new(StepAction::Type, selector)
            .with_value(text)
            .with_field(&field.name)])
    }

    async fn fill_select(
        &self,
        page: &dyn PageHandle,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<Step>, FillError> {
        // Multi-selects arrive as arrays; each entry goes through the same
        // match ladder and the canonical values are applied together.
        let wanted: Vec<String> = match value {
            Value::Array(items) => items.iter().filter_map(scalar_string_ref).collect(),
            other => scalar_string_ref(other).into_iter().collect(),
        };
        if wanted.is_empty() {
            return Err(FillError::UnusableValue {
                field: field.name.clone(),
                message: "empty select response".to_string(),
            });
        }

        let mut matched = Vec::with_capacity(wanted.len());
        for want in &wanted {
            let value = match_option(&field.options, want).ok_or_else(|| {
                FillError::OptionNotMatched {
                    wanted: want.clone(),
                    available: available_labels(&field.options),
                }
            })?;
            matched.push(value);
        }
        let joined = matched.join(",");

        let selector = apply_first(field, &selector_chain(field, None), |sel| {
            let joined = joined.clone();
            async move { page.set_value(&sel, &joined).await }
        })
        .await?;

        Ok(vec![Step::new(StepAction::Select, selector)
            .with_value(joined)
            .with_field(&field.name)])
    }

    async fn fill_checkbox(
        &self,
        page: &dyn PageHandle,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<Step>, FillError> {
        let response = CheckboxResponse::from_value(value);
        let consent = consent_lexicon_matches(&field.name, &field.label);

        // A lone consent checkbox is always checked, whatever the model said.
        if field.options.len() <= 1 {
            let checked = consent || response.as_bool();
            if !checked {
                return Ok(Vec::new());
            }
            let option_value = field.options.first().map(|o| o.value.clone());
            let selector = apply_first(
                field,
                &selector_chain(field, option_value.as_deref()),
                |sel| async move {
                    // Checkboxes are set, not toggled, so re-applying a
                    // response leaves the same final state.
                    page.set_value(&sel, "true").await
                },
            )
            .await?;
            return Ok(vec![Step::new(StepAction::Checkbox, selector)
                .with_value("true")
                .with_field(&field.name)]);
        }

        // Group: normalize the response shape once, then apply per option.
        let option_values: Vec<String> = field.options.iter().map(|o| o.value.clone()).collect();
        let to_check = response.normalize(&option_values);
        let mut steps = Vec::new();
        for option in field.options.iter().filter(|o| to_check.contains(&o.value)) {
            let selector = apply_first(
                field,
                &selector_chain(field, Some(&option.value)),
                |sel| async move { page.set_value(&sel, "true").await },
            )
            .await?;
            steps.push(
                Step::new(StepAction::Checkbox, selector)
                    .with_value("true")
                    .with_field(&field.name),
            );
        }
        Ok(steps)
    }

    async fn fill_radio(
        &self,
        page: &dyn PageHandle,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<Step>, FillError> {
        let want = scalar_string(value).ok_or_else(|| FillError::UnusableValue {
            field: field.name.clone(),
            message: format!("expected a scalar, got {}", value),
        })?;
        let option = match_option(&field.options, &want).ok_or_else(|| {
            FillError::OptionNotMatched {
                wanted: want.clone(),
                available: available_labels(&field.options),
            }
        })?;

        // Click only the matching member; sibling options stay untouched.
        let selector = apply_first(field, &selector_chain(field, Some(&option)), |sel| {
            async move { page.click(&sel).await }
        })
        .await?;

        Ok(vec![Step::new(StepAction::Radio, selector)
            .with_value(option)
            .with_field(&field.name)])
    }

    async fn fill_file(
        &self,
        page: &dyn PageHandle,
        field: &Field,
    ) -> Result<Vec<Step>, FillError> {
        let path = self
            .options
            .resume_path
            .as_ref()
            .ok_or(FillError::MissingResumePath)?;
        if !path.exists() {
            // Hard field failure, not retried.
            return Err(FillError::ResumeFileMissing(path.clone()));
        }

        let selector = apply_first(field, &selector_chain(field, None), |sel| {
            let path = path.clone();
            async move { page.upload_file(&sel, &path).await }
        })
        .await?;

        Ok(vec![Step::new(StepAction::Upload, selector)
            .with_value(path.display().to_string())
            .with_field(&field.name)])
    }

    async fn pace(&self) {
        if let Some((min, max)) = self.options.pacing_ms {
            if max > 0 {
                let ms = rand::thread_rng().gen_range(min..=max.max(min));
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
        }
    }
}

/// Try the selector chain in order; the first selector whose action
/// succeeds wins. Element-not-found moves to the next candidate; any other
/// browser failure on a resolved selector aborts the field with that error.
async fn apply_first<F, Fut>(
    field: &Field,
    chain: &[String],
    mut action: F,
) -> Result<String, FillError>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<(), BrowserError>>,
{
    for selector in chain {
        match action(selector.clone()).await {
            Ok(()) => return Ok(selector.clone()),
            Err(BrowserError::ElementNotFound(_)) => continue,
            Err(e) => return Err(FillError::Browser(e)),
        }
    }
    Err(FillError::SelectorNotFound(field.name.clone()))
}

/// Selector resolution chain, first match wins: extractor-supplied
/// candidates, name attribute (value-qualified for group members), id,
/// type-qualified name.
fn selector_chain(field: &Field, option_value: Option<&str>) -> Vec<String> {
    let mut chain = Vec::new();
    let grouped = matches!(field.field_type, FieldType::Radio | FieldType::Checkbox)
        && option_value.is_some();

    if grouped {
        // Extractor candidates identify the group's first member, not the
        // member the value selects; the value-qualified name selector leads.
        let value = option_value.unwrap_or_default();
        chain.push(format!("input[name='{}'][value='{}']", field.name, value));
        chain.push(format!(
            "input[type='{}'][name='{}'][value='{}']",
            field.field_type.attr(),
            field.name,
            value
        ));
    } else {
        chain.extend(field.selector_candidates.iter().cloned());
        if !field.name.is_empty() {
            chain.push(format!("[name='{}']", field.name));
        }
        if !field.id.is_empty() {
            chain.push(format!("[id='{}']", field.id));
        }
        if !field.name.is_empty() {
            let qualified = match field.field_type {
                FieldType::Select => format!("select[name='{}']", field.name),
                FieldType::Textarea => format!("textarea[name='{}']", field.name),
                _ => format!(
                    "input[type='{}'][name='{}']",
                    field.field_type.attr(),
                    field.name
                ),
            };
            chain.push(qualified);
        }
    }

    chain.dedup();
    chain
}

/// The select match ladder: exact value, case-insensitive exact text,
/// partial text containment (either direction), partial value containment.
/// Returns the canonical option value of the first hit.
pub(crate) fn match_option(options: &[FieldOption], wanted: &str) -> Option<String> {
    let wanted_lower = wanted.to_lowercase();

    if let Some(hit) = options.iter().find(|o| o.value == wanted) {
        return Some(hit.value.clone());
    }
    if let Some(hit) = options.iter().find(|o| o.text.eq_ignore_ascii_case(wanted)) {
        return Some(hit.value.clone());
    }
    if let Some(hit) = options.iter().find(|o| {
        let text = o.text.to_lowercase();
        !text.is_empty() && (text.contains(&wanted_lower) || wanted_lower.contains(&text))
    }) {
        return Some(hit.value.clone());
    }
    if let Some(hit) = options.iter().find(|o| {
        let value = o.value.to_lowercase();
        !value.is_empty() && (value.contains(&wanted_lower) || wanted_lower.contains(&value))
    }) {
        return Some(hit.value.clone());
    }
    None
}

/// Up to five option labels, for failure messages.
fn available_labels(options: &[FieldOption]) -> String {
    options
        .iter()
        .take(5)
        .map(|o| o.text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_string_ref).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

fn scalar_string_ref(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
