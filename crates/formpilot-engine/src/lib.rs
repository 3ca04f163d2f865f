//! The adaptive form-fill engine.
//!
//! One attempt flows through three tiers, cheapest first:
//!
//! 1. **Replay** — a stored [`Recipe`](formpilot_protocols::Recipe) for the
//!    platform key is executed step by step.
//! 2. **Adaptive** — on miss or replay failure, the page is extracted
//!    ([`FieldExtractor`]), answered ([`ResponseGenerator`]), filled
//!    ([`FormDriver`]) and, if fields failed, diagnosed from a screenshot
//!    ([`RecoveryAnalyzer`]).
//! 3. **Record** — a successful adaptive run is reverse-templated
//!    ([`TemplateInterpolator`]) and persisted so the next visit replays.
//!
//! The [`RecipeEngine`] orchestrates the tiers and keeps the cost ledger.

pub mod checkbox;
pub mod driver;
pub mod dropdown;
pub mod engine;
pub mod extractor;
pub mod generator;
pub mod recorder;
pub mod recovery;
pub mod retry;
pub mod template;

#[cfg(test)]
pub(crate) mod testsupport;

pub use checkbox::{consent_lexicon_matches, CheckboxResponse};
pub use driver::{FillOptions, FormDriver};
pub use dropdown::DropdownHeuristic;
pub use engine::{ApplyOutcome, CostLedger, CostModel, RecipeEngine, RecipePhase};
pub use extractor::FieldExtractor;
pub use generator::{GeneratorOptions, ResponseGenerator};
pub use recorder::AdaptiveRecorder;
pub use recovery::{RecoveryAnalyzer, RecoveryVerdict};
pub use retry::{retry_until, RetryPolicy};
pub use template::TemplateInterpolator;
