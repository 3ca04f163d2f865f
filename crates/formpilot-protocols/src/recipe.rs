//! Recipe and execution-record types.
//!
//! A recipe is a versioned, ordered list of replayable fill steps for one
//! platform key. Recipes are never hard-deleted; failed ones are superseded
//! by version bumps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "recipe_tests.rs"]
mod tests;

/// Separator between the ATS family and the tenant part of a platform key,
/// e.g. `greenhouse_acme`.
pub const PLATFORM_KEY_SEPARATOR: char = '_';

/// The replayable action kinds a step can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Type,
    Select,
    Click,
    Upload,
    Radio,
    Checkbox,
    Wait,
}

/// One replayable step of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub action: StepAction,
    pub selector: String,
    /// Literal value or `{{path}}` template marker, interpolated at replay
    /// time. Absent for pure click/wait steps.
    #[serde(default)]
    pub templated_value: Option<String>,
    /// The extracted field this step fills, when known.
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl Step {
    pub fn new(action: StepAction, selector: impl Into<String>) -> Self {
        Self {
            action,
            selector: selector.into(),
            templated_value: None,
            field_name: None,
            required: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.templated_value = Some(value.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field_name = Some(field.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A versioned, replayable fill plan for one platform key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub platform_key: String,
    pub ats_type: String,
    pub steps: Vec<Step>,
    /// Monotonic, bumped on every re-recording.
    pub version: u32,
    pub recording_cost: f64,
    pub replay_cost: f64,
    pub times_used: u32,
    pub failure_count: u32,
    pub success_rate: f64,
    pub total_saved: f64,
    pub last_used: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
}

impl Recipe {
    pub fn new(
        platform_key: impl Into<String>,
        ats_type: impl Into<String>,
        steps: Vec<Step>,
        recording_cost: f64,
        replay_cost: f64,
    ) -> Self {
        Self {
            platform_key: platform_key.into(),
            ats_type: ats_type.into(),
            steps,
            version: 1,
            recording_cost,
            replay_cost,
            times_used: 0,
            failure_count: 0,
            success_rate: 0.0,
            total_saved: 0.0,
            last_used: None,
            last_failure: None,
        }
    }

    /// The generic prefix of a platform key: everything before the first
    /// separator. `greenhouse_acme` falls back to `greenhouse`.
    pub fn generic_key(platform_key: &str) -> &str {
        platform_key
            .split(PLATFORM_KEY_SEPARATOR)
            .next()
            .unwrap_or(platform_key)
    }

    /// Amortized saving after `times_used` runs: the recording premium is
    /// paid once, every later replay avoids it.
    pub fn expected_saving(&self) -> f64 {
        let replays = self.times_used.saturating_sub(1);
        (self.recording_cost - self.replay_cost) * replays as f64
    }
}

/// How an attempt was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FillMethod {
    Replay,
    Record,
}

/// Append-only record of one attempt outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub platform_key: String,
    pub success: bool,
    pub method: FillMethod,
    pub cost: f64,
    #[serde(default)]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(platform_key: impl Into<String>, method: FillMethod, success: bool, cost: f64) -> Self {
        Self {
            platform_key: platform_key.into(),
            success,
            method,
            cost,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
