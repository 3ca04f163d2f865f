//! The adaptive recording agent: the expensive path that understands a
//! page it has never seen.
//!
//! One pass is extract -> gate on captcha -> generate -> validate -> fill,
//! with at most one vision-guided retry of a single failed field. A pass
//! that clears the success threshold yields the step log a recipe is
//! persisted from.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use formpilot_protocols::{
    AttemptRequest, CaptchaError, CaptchaSolver, Extraction, FillFailure, PageHandle, Recipe,
    RecordingAgent, RecordingError, RecordingOutcome,
};

use crate::driver::FormDriver;
use crate::extractor::FieldExtractor;
use crate::generator::ResponseGenerator;
use crate::recovery::RecoveryAnalyzer;

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;

pub struct AdaptiveRecorder {
    extractor: FieldExtractor,
    generator: ResponseGenerator,
    driver: FormDriver,
    recovery: Option<RecoveryAnalyzer>,
    captcha: Option<Arc<dyn CaptchaSolver>>,
    /// Lets an unsolved captcha pass through instead of hard-stopping.
    /// Meant for sandboxed runs against fixture pages.
    allow_unsolved_captcha: bool,
    success_threshold: f64,
    recording_cost: f64,
}

impl AdaptiveRecorder {
    pub fn new(generator: ResponseGenerator, driver: FormDriver) -> Self {
        Self {
            extractor: FieldExtractor::new(),
            generator,
            driver,
            recovery: None,
            captcha: None,
            allow_unsolved_captcha: false,
            success_threshold: 0.70,
            recording_cost: 0.80,
        }
    }

    pub fn with_extractor(mut self, extractor: FieldExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_recovery(mut self, recovery: RecoveryAnalyzer) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn with_captcha_solver(mut self, solver: Arc<dyn CaptchaSolver>) -> Self {
        self.captcha = Some(solver);
        self
    }

    pub fn allow_unsolved_captcha(mut self, allow: bool) -> Self {
        self.allow_unsolved_captcha = allow;
        self
    }

    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_recording_cost(mut self, cost: f64) -> Self {
        self.recording_cost = cost;
        self
    }

    /// Hard-stop unless a solver clears the page or the override is set.
    async fn gate_captcha(&self, page: &dyn PageHandle) -> Result<(), CaptchaError> {
        let solved = match &self.captcha {
            Some(solver) => solver.solve_and_inject(page).await?,
            None => false,
        };
        if solved {
            info!("Captcha solved");
            return Ok(());
        }
        if self.allow_unsolved_captcha {
            warn!("Captcha present but unsolved, continuing per configuration");
            return Ok(());
        }
        Err(CaptchaError::Unsolved)
    }

    /// One vision-guided retry of a single field. A retry that succeeds
    /// promotes the field from the failure list; anything else leaves the
    /// report as the fill pass produced it.
    async fn recover(
        &self,
        page: &dyn PageHandle,
        request: &AttemptRequest,
        extraction: &Extraction,
        responses: &formpilot_protocols::ResponseSet,
        report: &mut formpilot_protocols::FillReport,
        steps: &mut Vec<formpilot_protocols::Step>,
    ) {
        let Some(recovery) = &self.recovery else {
            return;
        };

        let verdict = match recovery.analyze(page, request, responses, report).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Recovery analysis failed: {}", e);
                return;
            }
        };

        let Some((field_name, new_value)) = verdict.retry() else {
            return;
        };
        let Some(field) = extraction.fields.iter().find(|f| f.name == field_name) else {
            warn!(field = field_name, "Verdict names an unknown field");
            return;
        };

        match self
            .driver
            .fill_field(page, field, &Value::String(new_value.to_string()))
            .await
        {
            Ok(mut retry_steps) => {
                info!(field = field_name, "Recovery retry succeeded");
                report.failures.retain(|f| f.field != field_name);
                if !report.filled.contains(&field.name) {
                    report.filled.push(field.name.clone());
                }
                steps.append(&mut retry_steps);
            }
            Err(e) => {
                warn!(field = field_name, "Recovery retry failed: {}", e);
            }
        }
    }
}

#[async_trait]
impl RecordingAgent for AdaptiveRecorder {
    async fn record(
        &self,
        page: &dyn PageHandle,
        request: &AttemptRequest,
    ) -> Result<RecordingOutcome, RecordingError> {
        let extraction = self
            .extractor
            .extract(page)
            .await
            .map_err(|e| RecordingError::Agent(e.to_string()))?;
        if extraction.fields.is_empty() {
            return Err(RecordingError::NothingExtracted);
        }
        debug!(
            fields = extraction.fields.len(),
            complexity = ?extraction.complexity,
            "Extraction done"
        );

        if extraction.has_captcha {
            self.gate_captcha(page).await?;
        }

        let responses = self
            .generator
            .generate(&extraction.fields, &request.profile, &request.job)
            .await?;

        let validation = ResponseGenerator::validate(&responses, &extraction.fields);
        if !validation.is_valid() {
            warn!(
                errors = validation.errors.len(),
                "Validation flagged generated responses"
            );
        }

        let (mut report, mut steps) = self.driver.fill(page, &extraction, &responses).await;

        // Validation errors count against the threshold exactly like fill
        // failures; a required field the model skipped never records cleanly.
        for issue in &validation.errors {
            if report.failures.iter().any(|f| f.field == issue.field) {
                continue;
            }
            debug!(field = %issue.field, "Validation error: {}", issue.message);
            report.filled.retain(|name| name != &issue.field);
            report
                .failures
                .push(FillFailure::new(&issue.field, issue.message.clone()));
        }

        if !report.failures.is_empty() {
            self.recover(page, request, &extraction, &responses, &mut report, &mut steps)
                .await;
        }

        if !report.is_success(self.success_threshold) {
            let summary = report
                .failures
                .iter()
                .map(|f| f.field.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(RecordingError::BelowThreshold(format!(
                "filled {}/{} fields, failed: [{}]",
                report.filled.len(),
                report.filled.len() + report.failures.len(),
                summary
            )));
        }

        info!(
            filled = report.filled.len(),
            failed = report.failures.len(),
            "Recording pass succeeded"
        );
        Ok(RecordingOutcome {
            steps,
            report,
            cost: self.recording_cost,
            ats_type: Recipe::generic_key(&request.platform_key).to_string(),
        })
    }
}
