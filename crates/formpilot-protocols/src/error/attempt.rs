//! Attempt-level errors: generation, replay, recording, captcha, and the
//! umbrella returned by the recipe engine.

use thiserror::Error;

use super::provider::ProviderError;
use super::store::StoreError;
use crate::recipe::StepAction;

/// Unparsable or absent model output. Attempt-fatal; there is no silent
/// default response. Provider-side failures, timeouts included, arrive
/// through the `Provider` variant.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Unparsable model output: {0}")]
    Unparsable(String),

    #[error("Model returned an empty response")]
    Empty,
}

/// A replay step failure. Aborts all remaining steps of the recipe.
#[derive(Debug, Error)]
#[error("Replay step {step_index} ({action:?}) failed: {message}")]
pub struct ReplayStepError {
    pub step_index: usize,
    pub action: StepAction,
    pub message: String,
}

/// The adaptive recording agent failed; no recipe is persisted.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Captcha(#[from] CaptchaError),

    #[error("Page yielded no fillable fields")]
    NothingExtracted,

    #[error("Fill pass did not reach the success threshold: {0}")]
    BelowThreshold(String),

    #[error("Recording agent failed: {0}")]
    Agent(String),
}

/// CAPTCHA failures hard-stop the attempt unless a test-mode override is
/// configured.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("CAPTCHA could not be solved")]
    Unsolved,

    #[error("CAPTCHA solver failed: {0}")]
    SolverFailed(String),
}

/// Umbrella error at the engine boundary.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Captcha(#[from] CaptchaError),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Browser error: {0}")]
    Browser(#[from] super::browser::BrowserError),
}
