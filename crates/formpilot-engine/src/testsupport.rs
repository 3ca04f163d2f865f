//! Hand-rolled test doubles shared by the engine test modules.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use formpilot_protocols::{
    AttemptRequest, BrowserError, CaptchaError, CaptchaSolver, CompletionOptions,
    CompletionProvider, ExecutionRecord, LearningEntry, LearningStore, PageHandle, ProviderError,
    Recipe, RecipeStore, RecordingAgent, RecordingError, RecordingOutcome, StoreError,
    VisionProvider,
};

/// In-memory page double. Selector actions succeed unless the selector was
/// marked missing or failing; applied values are recorded so tests can
/// assert final DOM state.
#[derive(Default)]
pub struct MockPage {
    /// Queued `evaluate` results, popped in order. Empty queue yields null.
    pub eval_results: Mutex<VecDeque<Value>>,
    pub eval_scripts: Mutex<Vec<String>>,
    pub values: Mutex<BTreeMap<String, String>>,
    pub clicks: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<(String, PathBuf)>>,
    pub navigations: Mutex<Vec<String>>,
    /// Selectors that resolve to nothing.
    pub missing_selectors: Mutex<HashSet<String>>,
    /// Selectors whose actions fail after resolving.
    pub failing_selectors: Mutex<HashSet<String>>,
    pub screenshot_data: String,
}

impl MockPage {
    pub fn new() -> Self {
        Self {
            screenshot_data: "bW9jay1qcGVn".to_string(),
            ..Self::default()
        }
    }

    pub fn push_eval(&self, value: Value) {
        self.eval_results.lock().unwrap().push_back(value);
    }

    pub fn mark_missing(&self, selector: &str) {
        self.missing_selectors
            .lock()
            .unwrap()
            .insert(selector.to_string());
    }

    pub fn mark_failing(&self, selector: &str) {
        self.failing_selectors
            .lock()
            .unwrap()
            .insert(selector.to_string());
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.values.lock().unwrap().get(selector).cloned()
    }

    pub fn final_values(&self) -> BTreeMap<String, String> {
        self.values.lock().unwrap().clone()
    }

    fn check(&self, selector: &str) -> Result<(), BrowserError> {
        if self.missing_selectors.lock().unwrap().contains(selector) {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        if self.failing_selectors.lock().unwrap().contains(selector) {
            return Err(BrowserError::ActionFailed(format!(
                "scripted failure on {}",
                selector
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PageHandle for MockPage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        self.eval_scripts.lock().unwrap().push(script.to_string());
        Ok(self
            .eval_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Value::Null))
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.check(selector)?;
        self.clicks.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn set_value(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        self.check(selector)?;
        self.values
            .lock()
            .unwrap()
            .insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn upload_file(&self, selector: &str, path: &Path) -> Result<(), BrowserError> {
        self.check(selector)?;
        self.uploads
            .lock()
            .unwrap()
            .push((selector.to_string(), path.to_path_buf()));
        Ok(())
    }

    async fn screenshot(&self) -> Result<String, BrowserError> {
        Ok(self.screenshot_data.clone())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout_ms: u64) -> Result<(), BrowserError> {
        if self.missing_selectors.lock().unwrap().contains(selector) {
            return Err(BrowserError::Timeout(selector.to_string()));
        }
        Ok(())
    }

    async fn url(&self) -> Result<String, BrowserError> {
        Ok(self
            .navigations
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".to_string()))
    }
}

/// Completion provider that replays scripted outputs in order.
pub struct ScriptedProvider {
    pub outputs: Mutex<VecDeque<Result<String, ProviderError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn with_outputs(outputs: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn single(output: &str) -> Self {
        Self::with_outputs(vec![Ok(output.to_string())])
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::EmptyCompletion))
    }
}

#[async_trait]
impl VisionProvider for ScriptedProvider {
    async fn generate_with_image(
        &self,
        prompt: &str,
        _image_base64: &str,
        _options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::EmptyCompletion))
    }
}

/// In-memory recipe store mirroring the SQLite store's stat semantics.
#[derive(Default)]
pub struct MemoryRecipeStore {
    pub recipes: Mutex<BTreeMap<String, Recipe>>,
    pub executions: Mutex<Vec<ExecutionRecord>>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipe(recipe: Recipe) -> Self {
        let store = Self::default();
        store
            .recipes
            .lock()
            .unwrap()
            .insert(recipe.platform_key.clone(), recipe);
        store
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn get(&self, platform_key: &str) -> Result<Option<Recipe>, StoreError> {
        Ok(self.recipes.lock().unwrap().get(platform_key).cloned())
    }

    async fn upsert(&self, recipe: &Recipe) -> Result<u32, StoreError> {
        let mut recipes = self.recipes.lock().unwrap();
        let version = match recipes.get(&recipe.platform_key) {
            Some(existing) => existing.version + 1,
            None => 1,
        };
        let mut stored = recipe.clone();
        stored.version = version;
        recipes.insert(recipe.platform_key.clone(), stored);
        Ok(version)
    }

    async fn record_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        self.executions.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn increment_stats(
        &self,
        platform_key: &str,
        success: bool,
        saved: f64,
    ) -> Result<(), StoreError> {
        let mut recipes = self.recipes.lock().unwrap();
        if let Some(recipe) = recipes.get_mut(platform_key) {
            recipe.times_used += 1;
            if !success {
                recipe.failure_count += 1;
            }
            recipe.success_rate =
                (recipe.times_used - recipe.failure_count) as f64 / recipe.times_used as f64;
            recipe.total_saved += saved;
            recipe.last_used = Some(chrono::Utc::now());
            if !success {
                recipe.last_failure = Some(chrono::Utc::now());
            }
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.recipes.lock().unwrap().values().cloned().collect())
    }
}

/// Append-only in-memory learning store.
#[derive(Default)]
pub struct MemoryLearningStore {
    pub entries: Mutex<Vec<LearningEntry>>,
}

#[async_trait]
impl LearningStore for MemoryLearningStore {
    async fn record(&self, entry: &LearningEntry) -> Result<(), StoreError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Recording agent that returns a scripted outcome without touching the page.
pub struct ScriptedAgent {
    pub outcome: Mutex<Option<Result<RecordingOutcome, RecordingError>>>,
    pub invocations: Mutex<u32>,
}

impl ScriptedAgent {
    pub fn ok(outcome: RecordingOutcome) -> Self {
        Self {
            outcome: Mutex::new(Some(Ok(outcome))),
            invocations: Mutex::new(0),
        }
    }

    pub fn failing(error: RecordingError) -> Self {
        Self {
            outcome: Mutex::new(Some(Err(error))),
            invocations: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        *self.invocations.lock().unwrap()
    }
}

#[async_trait]
impl RecordingAgent for ScriptedAgent {
    async fn record(
        &self,
        _page: &dyn PageHandle,
        _request: &AttemptRequest,
    ) -> Result<RecordingOutcome, RecordingError> {
        *self.invocations.lock().unwrap() += 1;
        self.outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(RecordingError::Agent("no scripted outcome".to_string())))
    }
}

/// Captcha solver with a fixed answer.
pub struct FixedCaptchaSolver(pub bool);

#[async_trait]
impl CaptchaSolver for FixedCaptchaSolver {
    async fn solve_and_inject(&self, _page: &dyn PageHandle) -> Result<bool, CaptchaError> {
        Ok(self.0)
    }
}
