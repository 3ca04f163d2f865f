//! Vision-based failure recovery.
//!
//! When a fill pass leaves field errors behind, the analyzer sends a
//! screenshot plus the error context to a vision-capable completion
//! service and asks for a structured verdict: either one field worth
//! retrying with a new value, or a needs-human call. Every invocation is
//! persisted to the learning store, duplicates included.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use formpilot_protocols::{
    AttemptRequest, CompletionOptions, FillReport, GenerationError, LearningEntry, LearningStore,
    PageHandle, ResponseSet, VisionProvider,
};

use crate::generator::strip_fences;

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;

/// Structured verdict returned by the vision service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryVerdict {
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub field_to_retry: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
    #[serde(default)]
    pub needs_manual_intervention: bool,
    #[serde(default)]
    pub learned_pattern: Option<String>,
}

impl RecoveryVerdict {
    /// The single-retry suggestion, when the verdict carries one.
    pub fn retry(&self) -> Option<(&str, &str)> {
        match (&self.field_to_retry, &self.new_value) {
            (Some(field), Some(value)) => Some((field.as_str(), value.as_str())),
            _ => None,
        }
    }
}

pub struct RecoveryAnalyzer {
    vision: Arc<dyn VisionProvider>,
    learning: Arc<dyn LearningStore>,
    timeout: Duration,
}

impl RecoveryAnalyzer {
    pub fn new(vision: Arc<dyn VisionProvider>, learning: Arc<dyn LearningStore>) -> Self {
        Self {
            vision,
            learning,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Diagnose a partially failed fill. A verdict the service could not
    /// express as JSON degrades to needs-manual-intervention; it is still
    /// recorded to the learning store.
    pub async fn analyze(
        &self,
        page: &dyn PageHandle,
        request: &AttemptRequest,
        responses: &ResponseSet,
        report: &FillReport,
    ) -> Result<RecoveryVerdict, GenerationError> {
        let screenshot = page
            .screenshot()
            .await
            .map_err(|e| GenerationError::Unparsable(format!("screenshot failed: {}", e)))?;

        let prompt = build_prompt(report, responses);
        let options = CompletionOptions::json()
            .with_max_tokens(1024)
            .with_temperature(0.0)
            .with_timeout(self.timeout);

        let raw = self
            .vision
            .generate_with_image(&prompt, &screenshot, &options)
            .await?;

        let verdict = match serde_json::from_str::<RecoveryVerdict>(strip_fences(&raw)) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Unparsable recovery verdict ({}); treating as needs-human", e);
                RecoveryVerdict {
                    issue: "unparsable vision verdict".to_string(),
                    solution: raw.clone(),
                    needs_manual_intervention: true,
                    ..RecoveryVerdict::default()
                }
            }
        };

        self.persist(request, responses, report, &verdict).await;
        info!(
            retry = verdict.retry().is_some(),
            needs_human = verdict.needs_manual_intervention,
            "Recovery verdict"
        );
        Ok(verdict)
    }

    /// Persisted on every invocation, whatever the verdict said. A store
    /// failure here only logs; recovery is best-effort observability.
    async fn persist(
        &self,
        request: &AttemptRequest,
        responses: &ResponseSet,
        report: &FillReport,
        verdict: &RecoveryVerdict,
    ) {
        let mut entry = LearningEntry::new(&request.url, &request.job.company);
        entry.fields = report.failures.iter().map(|f| f.field.clone()).collect();
        entry.responses = json!(responses);
        entry.issues = report
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.field, f.message))
            .collect::<Vec<_>>()
            .join("; ");
        entry.solution = if verdict.solution.is_empty() {
            verdict.issue.clone()
        } else {
            verdict.solution.clone()
        };

        if let Err(e) = self.learning.record(&entry).await {
            warn!("Failed to persist learning entry: {}", e);
        }
    }
}

fn build_prompt(report: &FillReport, responses: &ResponseSet) -> String {
    let failures = report
        .failures
        .iter()
        .map(|f| format!("- {}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "A job application form was partially filled; the screenshot shows \
         its current state.\n\
         \n\
         Failed fields:\n{failures}\n\
         \n\
         Generated responses:\n{responses}\n\
         \n\
         Diagnose the failure. Respond with a single JSON object, no \
         markdown fences:\n\
         {{\"issue\": \"...\", \"solution\": \"...\", \"field_to_retry\": \
         \"name or null\", \"new_value\": \"value or null\", \
         \"needs_manual_intervention\": false, \"learned_pattern\": \
         \"reusable hint or null\"}}\n\
         \n\
         Suggest at most one field to retry. If the form cannot be fixed \
         automatically set needs_manual_intervention to true.",
        failures = failures,
        responses = serde_json::to_string(responses).unwrap_or_default(),
    )
}
