//! Field extraction: one page visit in, one [`Extraction`] out.
//!
//! A single injected script snapshots every interactive element plus the
//! submit target and captcha markers. Native elements map straight to
//! fields; custom dropdown widgets go through the heuristic ladder in
//! [`crate::dropdown`] and a reveal-read-close probe. A malformed element
//! is skipped with a warning, never fatal to the whole extraction.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use formpilot_protocols::{
    BrowserError, Extraction, Field, FieldOption, FieldType, PageHandle, SubmitTarget,
};

use crate::dropdown::{self, MENU_PATTERNS};
use crate::retry::{retry_until, RetryPolicy};

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;

/// Raw element snapshot as emitted by the page script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawElement {
    #[serde(default)]
    pub tag: String,
    #[serde(default, rename = "type")]
    pub input_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub has_click_handler: bool,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub value: String,
    /// Populated for native selects.
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub max_length: Option<u32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct PageSnapshot {
    #[serde(default)]
    elements: Vec<Value>,
    #[serde(default)]
    submit: Option<SubmitTarget>,
    #[serde(default)]
    has_captcha: bool,
}

/// Extracts the field inventory of a loaded page.
pub struct FieldExtractor {
    probe_policy: RetryPolicy,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self {
            probe_policy: RetryPolicy::default(),
        }
    }

    pub fn with_probe_policy(mut self, policy: RetryPolicy) -> Self {
        self.probe_policy = policy;
        self
    }

    /// Snapshot the page and assemble the extraction.
    ///
    /// An empty result is valid output; the caller decides whether it is
    /// fatal for the attempt.
    pub async fn extract(&self, page: &dyn PageHandle) -> Result<Extraction, BrowserError> {
        let raw = page.evaluate(PAGE_SNAPSHOT_SCRIPT).await?;
        let snapshot: PageSnapshot = serde_json::from_value(raw)
            .map_err(|e| BrowserError::JavaScript(format!("bad page snapshot: {}", e)))?;

        let mut fields: Vec<Field> = Vec::new();

        for element in snapshot.elements {
            let raw: RawElement = match serde_json::from_value(element) {
                Ok(raw) => raw,
                Err(e) => {
                    // Per-element extraction errors are non-fatal.
                    warn!("Skipping malformed element: {}", e);
                    continue;
                }
            };

            match self.classify(page, &raw).await? {
                Some(field) => self.merge_field(&mut fields, field, &raw),
                None => continue,
            }
        }

        debug!(
            field_count = fields.len(),
            has_captcha = snapshot.has_captcha,
            "Extraction complete"
        );
        Ok(Extraction::new(fields, snapshot.submit, snapshot.has_captcha))
    }

    /// Map one raw element to a field, probing custom dropdowns as needed.
    async fn classify(
        &self,
        page: &dyn PageHandle,
        raw: &RawElement,
    ) -> Result<Option<Field>, BrowserError> {
        let field = match raw.tag.as_str() {
            "select" => Some(self.base_field(raw, FieldType::Select)),
            "textarea" => Some(self.base_field(raw, FieldType::Textarea)),
            "input" => match raw.input_type.as_str() {
                "email" => Some(self.base_field(raw, FieldType::Email)),
                "tel" => Some(self.base_field(raw, FieldType::Tel)),
                "url" => Some(self.base_field(raw, FieldType::Url)),
                "number" => Some(self.base_field(raw, FieldType::Number)),
                "date" => Some(self.base_field(raw, FieldType::Date)),
                "checkbox" => Some(self.base_field(raw, FieldType::Checkbox)),
                "radio" => Some(self.base_field(raw, FieldType::Radio)),
                "file" => Some(self.base_field(raw, FieldType::File)),
                "hidden" | "submit" | "button" | "image" | "reset" => None,
                // Plain text inputs may still be custom dropdown triggers.
                _ => match self.try_custom_dropdown(page, raw).await? {
                    Some(field) => Some(field),
                    None => Some(self.base_field(raw, FieldType::Text)),
                },
            },
            // Non-native widgets are only interesting as dropdown triggers.
            _ => self.try_custom_dropdown(page, raw).await?,
        };
        Ok(field)
    }

    async fn try_custom_dropdown(
        &self,
        page: &dyn PageHandle,
        raw: &RawElement,
    ) -> Result<Option<Field>, BrowserError> {
        let Some(reason) = dropdown::detect(raw) else {
            return Ok(None);
        };
        let Some(trigger) = self.selector_candidates(raw).into_iter().next() else {
            return Ok(None);
        };

        debug!(selector = %trigger, heuristic = reason, "Probing custom dropdown");
        let options = self.probe_options(page, &trigger).await?;

        let mut field = self.base_field(raw, FieldType::Select);
        field.options = options;
        Ok(Some(field))
    }

    /// Reveal-read-close: open the widget, wait (bounded) for a visible
    /// option menu, read its options, close it again. A probe timeout
    /// records the dropdown with empty options rather than failing the
    /// whole extraction.
    async fn probe_options(
        &self,
        page: &dyn PageHandle,
        trigger: &str,
    ) -> Result<Vec<FieldOption>, BrowserError> {
        if let Err(e) = page.click(trigger).await {
            warn!(selector = %trigger, "Dropdown trigger click failed: {}", e);
            return Ok(Vec::new());
        }

        let menu = retry_until(&self.probe_policy, "dropdown menu", || async {
            let found = page.evaluate(&find_menu_script()).await?;
            Ok(found.as_str().map(str::to_string))
        })
        .await;

        let options = match menu {
            Ok(menu_selector) => {
                let raw = page.evaluate(&read_options_script(&menu_selector)).await?;
                serde_json::from_value(raw).unwrap_or_default()
            }
            Err(BrowserError::Timeout(_)) => {
                warn!(selector = %trigger, "No option menu appeared before timeout");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        // Close the widget so the probe leaves the page as it found it.
        let _ = page.evaluate(CLOSE_MENU_SCRIPT).await;
        Ok(options)
    }

    fn base_field(&self, raw: &RawElement, field_type: FieldType) -> Field {
        Field {
            id: raw.id.clone(),
            name: if raw.name.is_empty() {
                raw.id.clone()
            } else {
                raw.name.clone()
            },
            field_type,
            label: raw.label.clone(),
            placeholder: raw.placeholder.clone(),
            required: raw.required,
            options: raw.options.clone(),
            visible: raw.visible,
            max_length: raw.max_length,
            selector_candidates: self.selector_candidates(raw),
        }
    }

    fn selector_candidates(&self, raw: &RawElement) -> Vec<String> {
        let mut candidates = Vec::new();
        if !raw.id.is_empty() {
            candidates.push(format!("[id='{}']", raw.id));
        }
        if !raw.name.is_empty() {
            if raw.tag == "input" && matches!(raw.input_type.as_str(), "radio" | "checkbox") {
                // Value-qualified: group members share the name.
                candidates.push(format!(
                    "input[name='{}'][value='{}']",
                    raw.name, raw.value
                ));
            } else {
                candidates.push(format!("{}[name='{}']", raw.tag, raw.name));
            }
        }
        candidates
    }

    /// Radio/checkbox members sharing a name collapse into one grouped
    /// field; each member contributes an option carrying its own label.
    fn merge_field(&self, fields: &mut Vec<Field>, field: Field, raw: &RawElement) {
        if matches!(field.field_type, FieldType::Radio | FieldType::Checkbox) {
            let option = FieldOption::new(
                if raw.value.is_empty() {
                    raw.label.clone()
                } else {
                    raw.value.clone()
                },
                raw.label.clone(),
            );
            if let Some(group) = fields
                .iter_mut()
                .find(|f| f.name == field.name && f.field_type == field.field_type)
            {
                group.options.push(option);
                group.required |= field.required;
                return;
            }
            let mut group = field;
            group.options = vec![option];
            fields.push(group);
            return;
        }
        fields.push(field);
    }
}

/// Single-pass page snapshot: interactive elements, submit target, captcha
/// markers.
const PAGE_SNAPSHOT_SCRIPT: &str = r#"
(() => {
    const visible = (el) => {
        const style = window.getComputedStyle(el);
        return style.display !== 'none' && style.visibility !== 'hidden'
            && el.offsetParent !== null;
    };
    const labelFor = (el) => {
        if (el.id) {
            const label = document.querySelector(`label[for="${el.id}"]`);
            if (label) return label.textContent.trim();
        }
        const wrapping = el.closest('label');
        if (wrapping) return wrapping.textContent.trim();
        return el.getAttribute('aria-label') || '';
    };
    const snapshot = (el) => ({
        tag: el.tagName.toLowerCase(),
        type: (el.getAttribute('type') || '').toLowerCase(),
        id: el.id || '',
        name: el.getAttribute('name') || '',
        label: labelFor(el).slice(0, 200),
        placeholder: el.getAttribute('placeholder') || '',
        required: el.required || el.getAttribute('aria-required') === 'true',
        visible: visible(el),
        readonly: el.readOnly === true || el.hasAttribute('readonly'),
        has_click_handler: el.onclick != null || el.hasAttribute('onclick'),
        class_name: el.className && el.className.baseVal !== undefined
            ? el.className.baseVal : (el.className || ''),
        role: el.getAttribute('role') || '',
        value: el.value !== undefined ? String(el.value) : '',
        max_length: el.maxLength > 0 ? el.maxLength : null,
        options: el.tagName === 'SELECT'
            ? Array.from(el.options).map(o => ({ value: o.value, text: o.text.trim() }))
            : [],
    });

    const elements = [];
    document.querySelectorAll(
        'input, select, textarea, [role="combobox"], [role="listbox"], ' +
        'div[class*="select"], div[class*="dropdown"]'
    ).forEach(el => { if (visible(el) || el.tagName !== 'DIV') elements.push(snapshot(el)); });

    let submit = null;
    const submitEl = document.querySelector('button[type="submit"], input[type="submit"]')
        || Array.from(document.querySelectorAll('button')).find(b =>
            /submit|apply|send|continue/i.test(b.textContent));
    if (submitEl) {
        submit = {
            selector: submitEl.id ? `[id='${submitEl.id}']` : 'button[type="submit"]',
            text: (submitEl.textContent || submitEl.value || '').trim(),
        };
    }

    const has_captcha = !!document.querySelector(
        'iframe[src*="recaptcha"], iframe[src*="hcaptcha"], .g-recaptcha, .h-captcha, [data-sitekey]'
    );

    return { elements, submit, has_captcha };
})()
"#;

fn find_menu_script() -> String {
    format!(
        r#"
(() => {{
    const patterns = {patterns};
    for (const pattern of patterns) {{
        const el = document.querySelector(pattern);
        if (el && el.offsetParent !== null) return pattern;
    }}
    return null;
}})()
"#,
        patterns = json!(MENU_PATTERNS)
    )
}

fn read_options_script(menu_selector: &str) -> String {
    format!(
        r#"
(() => {{
    const menu = document.querySelector({selector});
    if (!menu) return [];
    const nodes = menu.querySelectorAll('[role="option"], li, .select__option');
    return Array.from(nodes)
        .filter(n => n.offsetParent !== null && n.textContent.trim())
        .map(n => ({{
            value: n.getAttribute('data-value') || n.textContent.trim(),
            text: n.textContent.trim(),
        }}));
}})()
"#,
        selector = json!(menu_selector)
    )
}

const CLOSE_MENU_SCRIPT: &str = r#"
(() => {
    document.activeElement && document.activeElement.blur();
    document.body.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', bubbles: true }));
    return true;
})()
"#;
