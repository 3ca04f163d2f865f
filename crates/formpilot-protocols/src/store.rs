//! Persistence collaborator traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::recipe::{ExecutionRecord, Recipe};

/// Recipe persistence, shared across concurrent attempts.
///
/// Stat updates must be applied as atomic increments at the store level;
/// callers hold no lock.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Exact-key lookup. Generic-prefix fallback is the engine's job.
    async fn get(&self, platform_key: &str) -> Result<Option<Recipe>, StoreError>;

    /// Insert a new recipe or replace steps of an existing one, bumping its
    /// version. Returns the stored version. Recipes are never hard-deleted.
    async fn upsert(&self, recipe: &Recipe) -> Result<u32, StoreError>;

    /// Append one execution record. Append-only.
    async fn record_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError>;

    /// Atomically bump usage counters and derived stats for a platform key.
    /// `saved` is added to the recipe's running total.
    async fn increment_stats(
        &self,
        platform_key: &str,
        success: bool,
        saved: f64,
    ) -> Result<(), StoreError>;

    /// All stored recipes, for reporting surfaces.
    async fn list(&self) -> Result<Vec<Recipe>, StoreError>;
}

/// One recovery-analysis observation.
///
/// Duplicate entries across repeated failures on the same domain are
/// acceptable and expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningEntry {
    pub url: String,
    pub company: String,
    pub fields: Vec<String>,
    pub responses: Value,
    pub issues: String,
    pub solution: String,
    pub timestamp: DateTime<Utc>,
}

impl LearningEntry {
    pub fn new(url: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            company: company.into(),
            fields: Vec::new(),
            responses: Value::Null,
            issues: String::new(),
            solution: String::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only store of recovery observations.
#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn record(&self, entry: &LearningEntry) -> Result<(), StoreError>;
}
