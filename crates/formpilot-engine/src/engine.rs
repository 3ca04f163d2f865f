//! The three-tier recipe engine.
//!
//! `apply` tries the cheapest path first: replay a stored recipe for the
//! platform key. A lookup miss or a failed replay step falls back to the
//! adaptive recording agent; a successful recording is reverse-templated
//! and persisted so the next visit replays. Every terminal outcome appends
//! exactly one execution record and bumps the recipe's stats atomically at
//! the store.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use formpilot_protocols::{
    AttemptError, AttemptRequest, BrowserError, ExecutionRecord, FillMethod, FillReport,
    PageHandle, Profile, Recipe, RecipeStore, RecordingAgent, ReplayStepError, Step, StepAction,
    StoreError,
};

use crate::template::TemplateInterpolator;

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

/// The phase an attempt terminated in. `Replaying` and `Recorded` are the
/// two success terminals; `Recording` marks an adaptive pass that failed
/// before a recipe could be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipePhase {
    Replaying,
    Recording,
    Recorded,
}

/// Relative cost of the two paths. The adaptive path runs extraction,
/// generation and possibly vision analysis; replay is a handful of DOM
/// round trips. Defaults reflect roughly a 16x ratio.
#[derive(Debug, Clone)]
pub struct CostModel {
    pub replay_cost: f64,
    pub recording_cost: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            replay_cost: 0.05,
            recording_cost: 0.80,
        }
    }
}

/// Explicit cost accounting for one attempt, threaded through the engine
/// and returned to the caller. Never process-wide state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostLedger {
    entries: Vec<CostEntry>,
}

#[derive(Debug, Clone, Serialize)]
struct CostEntry {
    label: String,
    amount: f64,
}

impl CostLedger {
    pub fn charge(&mut self, label: impl Into<String>, amount: f64) {
        self.entries.push(CostEntry {
            label: label.into(),
            amount,
        });
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What one `apply` call came back with.
#[derive(Debug)]
pub struct ApplyOutcome {
    /// The state the attempt terminated in.
    pub phase: RecipePhase,
    pub method: FillMethod,
    pub success: bool,
    pub platform_key: String,
    pub recipe_version: Option<u32>,
    pub report: Option<FillReport>,
    pub error: Option<String>,
    pub costs: CostLedger,
}

pub struct RecipeEngine {
    store: Arc<dyn RecipeStore>,
    agent: Arc<dyn RecordingAgent>,
    interpolator: TemplateInterpolator,
    cost_model: CostModel,
}

impl RecipeEngine {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        agent: Arc<dyn RecordingAgent>,
        cost_model: CostModel,
    ) -> Self {
        Self {
            store,
            agent,
            interpolator: TemplateInterpolator::new(),
            cost_model,
        }
    }

    /// Run one application attempt against a loaded page handle.
    pub async fn apply(
        &self,
        page: &dyn PageHandle,
        request: &AttemptRequest,
    ) -> Result<ApplyOutcome, AttemptError> {
        page.navigate(&request.url).await?;
        let mut costs = CostLedger::default();

        match self.load_recipe(&request.platform_key).await? {
            Some(recipe) => {
                info!(
                    platform_key = %recipe.platform_key,
                    version = recipe.version,
                    "Recipe found, replaying"
                );
                match self.replay(page, &recipe, &request.profile).await {
                    Ok(report) => {
                        costs.charge("replay", recipe.replay_cost);
                        self.store
                            .record_execution(&ExecutionRecord::new(
                                &recipe.platform_key,
                                FillMethod::Replay,
                                true,
                                recipe.replay_cost,
                            ))
                            .await?;
                        // Each successful replay banks the recording premium.
                        self.store
                            .increment_stats(
                                &recipe.platform_key,
                                true,
                                recipe.recording_cost - recipe.replay_cost,
                            )
                            .await?;
                        Ok(ApplyOutcome {
                            phase: RecipePhase::Replaying,
                            method: FillMethod::Replay,
                            success: true,
                            platform_key: recipe.platform_key.clone(),
                            recipe_version: Some(recipe.version),
                            report: Some(report),
                            error: None,
                            costs,
                        })
                    }
                    Err(step_error) => {
                        warn!(
                            platform_key = %recipe.platform_key,
                            "Replay failed, falling back to recording: {}",
                            step_error
                        );
                        costs.charge("failed_replay", recipe.replay_cost);
                        self.store
                            .record_execution(
                                &ExecutionRecord::new(
                                    &recipe.platform_key,
                                    FillMethod::Replay,
                                    false,
                                    recipe.replay_cost,
                                )
                                .with_error(step_error.to_string()),
                            )
                            .await?;
                        self.store
                            .increment_stats(&recipe.platform_key, false, 0.0)
                            .await?;
                        self.record(page, request, costs).await
                    }
                }
            }
            None => {
                debug!(platform_key = %request.platform_key, "No recipe, recording");
                self.record(page, request, costs).await
            }
        }
    }

    /// Exact-key lookup, then the generic prefix (the key truncated before
    /// its first separator).
    async fn load_recipe(&self, platform_key: &str) -> Result<Option<Recipe>, StoreError> {
        if let Some(recipe) = self.store.get(platform_key).await? {
            return Ok(Some(recipe));
        }
        let generic = Recipe::generic_key(platform_key);
        if generic != platform_key {
            return self.store.get(generic).await;
        }
        Ok(None)
    }

    /// Execute the recipe's steps strictly in order, interpolating each
    /// step's value immediately before its action. The first failing step
    /// aborts all remaining steps.
    async fn replay(
        &self,
        page: &dyn PageHandle,
        recipe: &Recipe,
        profile: &Profile,
    ) -> Result<FillReport, ReplayStepError> {
        let mut report = FillReport::default();

        for (step_index, step) in recipe.steps.iter().enumerate() {
            self.execute_step(page, step, profile)
                .await
                .map_err(|e| ReplayStepError {
                    step_index,
                    action: step.action,
                    message: e.to_string(),
                })?;
            if let Some(field) = &step.field_name {
                if !report.filled.contains(field) {
                    report.filled.push(field.clone());
                }
            }
        }

        Ok(report)
    }

    async fn execute_step(
        &self,
        page: &dyn PageHandle,
        step: &Step,
        profile: &Profile,
    ) -> Result<(), BrowserError> {
        let value = step
            .templated_value
            .as_deref()
            .map(|t| self.interpolator.interpolate(t, profile));

        match step.action {
            StepAction::Type | StepAction::Select => {
                let value = value.ok_or_else(|| {
                    BrowserError::ActionFailed("step carries no value".to_string())
                })?;
                page.set_value(&step.selector, &value).await
            }
            StepAction::Click | StepAction::Radio => page.click(&step.selector).await,
            StepAction::Checkbox => {
                page.set_value(&step.selector, value.as_deref().unwrap_or("true"))
                    .await
            }
            StepAction::Upload => {
                let value = value.ok_or_else(|| {
                    BrowserError::ActionFailed("upload step carries no path".to_string())
                })?;
                page.upload_file(&step.selector, Path::new(&value)).await
            }
            StepAction::Wait => page.wait_for_selector(&step.selector, 10_000).await,
        }
    }

    /// The RECORDING phase: defer to the adaptive agent, persist its step
    /// log reverse-templated against the profile.
    async fn record(
        &self,
        page: &dyn PageHandle,
        request: &AttemptRequest,
        mut costs: CostLedger,
    ) -> Result<ApplyOutcome, AttemptError> {
        match self.agent.record(page, request).await {
            Ok(outcome) => {
                costs.charge("recording", outcome.cost);

                let steps = self.reverse_template(outcome.steps, &request.profile);
                let recipe = Recipe::new(
                    &request.platform_key,
                    &outcome.ats_type,
                    steps,
                    outcome.cost,
                    self.cost_model.replay_cost,
                );
                let version = self.store.upsert(&recipe).await?;
                self.store
                    .record_execution(&ExecutionRecord::new(
                        &request.platform_key,
                        FillMethod::Record,
                        true,
                        outcome.cost,
                    ))
                    .await?;
                // The first use pays the premium; nothing saved yet.
                self.store
                    .increment_stats(&request.platform_key, true, 0.0)
                    .await?;

                info!(
                    platform_key = %request.platform_key,
                    version,
                    "Recorded recipe"
                );
                Ok(ApplyOutcome {
                    phase: RecipePhase::Recorded,
                    method: FillMethod::Record,
                    success: true,
                    platform_key: request.platform_key.clone(),
                    recipe_version: Some(version),
                    report: Some(outcome.report),
                    error: None,
                    costs,
                })
            }
            Err(e) => {
                costs.charge("failed_recording", self.cost_model.recording_cost);
                self.store
                    .record_execution(
                        &ExecutionRecord::new(
                            &request.platform_key,
                            FillMethod::Record,
                            false,
                            self.cost_model.recording_cost,
                        )
                        .with_error(e.to_string()),
                    )
                    .await?;

                warn!(platform_key = %request.platform_key, "Recording failed: {}", e);
                Ok(ApplyOutcome {
                    phase: RecipePhase::Recording,
                    method: FillMethod::Record,
                    success: false,
                    platform_key: request.platform_key.clone(),
                    recipe_version: None,
                    report: None,
                    error: Some(e.to_string()),
                    costs,
                })
            }
        }
    }

    /// Map recorded literals back to profile-relative markers so the recipe
    /// replays for any candidate. Values that already carry markers are
    /// left alone; unmatched literals stay verbatim.
    fn reverse_template(&self, steps: Vec<Step>, profile: &Profile) -> Vec<Step> {
        steps
            .into_iter()
            .map(|mut step| {
                if let Some(value) = &step.templated_value {
                    if !self.interpolator.has_marker(value) {
                        step.templated_value = Some(self.interpolator.reverse(value, profile));
                    }
                }
                step
            })
            .collect()
    }
}
