//! Core protocol definitions for Formpilot.
//!
//! This crate defines the shared contracts between the form-fill engine and
//! its collaborators:
//!
//! - **Data model**: [`Field`], [`Extraction`], [`ResponseSet`], [`Recipe`],
//!   [`Step`], [`ExecutionRecord`], [`Profile`]
//! - **Collaborator traits**: [`PageHandle`] (browser control),
//!   [`CompletionProvider`] / [`VisionProvider`] (LLM services),
//!   [`RecipeStore`] / [`LearningStore`] (persistence),
//!   [`CaptchaSolver`], [`RecordingAgent`]
//! - **Error taxonomy**: per-domain error enums under [`error`]
//!
//! The crate performs no I/O of its own; every implementation lives in a
//! sibling crate.

pub mod agent;
pub mod browser;
pub mod error;
pub mod field;
pub mod profile;
pub mod provider;
pub mod recipe;
pub mod response;
pub mod store;

pub use agent::{AttemptRequest, RecordingAgent, RecordingOutcome};
pub use browser::PageHandle;
pub use error::{
    AttemptError, BrowserError, CaptchaError, FillError, GenerationError, ProviderError,
    RecordingError, ReplayStepError, StoreError,
};
pub use field::{Complexity, Extraction, Field, FieldOption, FieldType, SubmitTarget};
pub use profile::{JobContext, Profile};
pub use provider::{CaptchaSolver, CompletionOptions, CompletionProvider, VisionProvider};
pub use recipe::{ExecutionRecord, FillMethod, Recipe, Step, StepAction};
pub use response::{FillFailure, FillReport, ResponseSet, ValidationIssue, ValidationReport};
pub use store::{LearningEntry, LearningStore, RecipeStore};
