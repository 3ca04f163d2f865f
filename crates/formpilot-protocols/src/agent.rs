//! Recording agent collaborator.

use async_trait::async_trait;

use crate::browser::PageHandle;
use crate::error::RecordingError;
use crate::profile::{JobContext, Profile};
use crate::recipe::Step;
use crate::response::FillReport;

/// Everything one application attempt needs as input.
#[derive(Debug, Clone)]
pub struct AttemptRequest {
    pub url: String,
    pub platform_key: String,
    pub profile: Profile,
    pub job: JobContext,
}

impl AttemptRequest {
    pub fn new(url: impl Into<String>, platform_key: impl Into<String>, profile: Profile) -> Self {
        Self {
            url: url.into(),
            platform_key: platform_key.into(),
            profile,
            job: JobContext::default(),
        }
    }

    pub fn with_job(mut self, job: JobContext) -> Self {
        self.job = job;
        self
    }
}

/// What a successful adaptive run produced: the step log to reverse-template
/// into a recipe, the fill report, and the cost actually incurred.
#[derive(Debug, Clone)]
pub struct RecordingOutcome {
    pub steps: Vec<Step>,
    pub report: FillReport,
    pub cost: f64,
    /// ATS family inferred from the page, used for the recipe's ats_type.
    pub ats_type: String,
}

/// The adaptive pipeline behind the engine's RECORDING state.
///
/// The engine ships a default implementation over the extractor, generator,
/// driver and recovery analyzer; tests substitute scripted agents.
#[async_trait]
pub trait RecordingAgent: Send + Sync {
    async fn record(
        &self,
        page: &dyn PageHandle,
        request: &AttemptRequest,
    ) -> Result<RecordingOutcome, RecordingError>;
}
