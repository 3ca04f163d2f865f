//! Error taxonomy, one enum per failure domain.
//!
//! Field-level failures ([`FillError`]) are recovered locally and aggregated;
//! form-level failures ([`GenerationError`], [`CaptchaError`]) propagate as
//! attempt failure through [`AttemptError`].

mod attempt;
mod browser;
mod fill;
mod provider;
mod store;

pub use attempt::{AttemptError, CaptchaError, GenerationError, RecordingError, ReplayStepError};
pub use browser::BrowserError;
pub use fill::FillError;
pub use provider::ProviderError;
pub use store::StoreError;
