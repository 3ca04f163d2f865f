//! Form field inventory types.
//!
//! An [`Extraction`] is a structured snapshot of one page's form, produced by
//! the field extractor and discarded after a single fill attempt.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "field_tests.rs"]
mod tests;

/// The interactive element kinds the engine knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Email,
    Tel,
    Url,
    Number,
    Date,
    Textarea,
    Select,
    Checkbox,
    Radio,
    File,
}

impl FieldType {
    /// Whether the field is filled by setting a value and firing input events.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            FieldType::Text
                | FieldType::Email
                | FieldType::Tel
                | FieldType::Url
                | FieldType::Number
                | FieldType::Date
                | FieldType::Textarea
        )
    }

    /// The `type` attribute value used when building type-qualified selectors.
    pub fn attr(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Tel => "tel",
            FieldType::Url => "url",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::File => "file",
        }
    }
}

/// One selectable option of a select, radio group or checkbox group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub text: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }
}

/// A single form field as seen by the extractor.
///
/// `name` is unique within an extraction except for radio/checkbox group
/// members, which share it; each group member's label is carried in its
/// [`FieldOption`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub max_length: Option<u32>,
    /// Selectors the extractor judged usable, most specific first.
    #[serde(default)]
    pub selector_candidates: Vec<String>,
}

fn default_visible() -> bool {
    true
}

impl Field {
    /// Create a field with the given name and type; everything else defaulted.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            field_type,
            label: String::new(),
            placeholder: String::new(),
            required: false,
            options: Vec::new(),
            visible: true,
            max_length: None,
            selector_candidates: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector_candidates.push(selector.into());
        self
    }

    /// Whether the label reads like an essay prompt rather than a short answer.
    pub fn is_essay(&self) -> bool {
        if self.field_type != FieldType::Textarea {
            return false;
        }
        let label = self.label.to_lowercase();
        label.len() > 80
            || ["why ", "describe", "tell us", "explain", "what interests"]
                .iter()
                .any(|kw| label.contains(kw))
    }
}

/// The element that submits the form, if one was identified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTarget {
    pub selector: String,
    pub text: String,
}

/// Rough difficulty classification of an extracted form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    /// Classify a field inventory: simple ≤ 10 fields, medium 11–20 or any
    /// essay question present, complex > 20.
    pub fn classify(fields: &[Field]) -> Self {
        let count = fields.len();
        if count > 20 {
            Complexity::Complex
        } else if count > 10 || fields.iter().any(Field::is_essay) {
            Complexity::Medium
        } else {
            Complexity::Simple
        }
    }
}

/// Structured snapshot of a form for one page visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub fields: Vec<Field>,
    pub submit_target: Option<SubmitTarget>,
    pub has_captcha: bool,
    pub complexity: Complexity,
}

impl Extraction {
    /// Build an extraction, deriving the complexity from the field list.
    pub fn new(fields: Vec<Field>, submit_target: Option<SubmitTarget>, has_captcha: bool) -> Self {
        let complexity = Complexity::classify(&fields);
        Self {
            fields,
            submit_target,
            has_captcha,
            complexity,
        }
    }

    /// An empty extraction is valid output; whether it is fatal is the
    /// caller's call.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of all required fields, deduplicated in order of appearance.
    pub fn required_names(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for field in self.fields.iter().filter(|f| f.required) {
            if !seen.contains(&field.name.as_str()) {
                seen.push(field.name.as_str());
            }
        }
        seen
    }
}
