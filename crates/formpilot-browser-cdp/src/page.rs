//! Page session implementing the browser collaborator trait.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::debug;

use formpilot_protocols::{BrowserError, PageHandle};

use crate::client::{dispatch, PendingRequest, WsSink};
use crate::script::{click_script, exists_script, set_value_script};

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A session attached to a single page target.
pub struct CdpPage {
    session_id: String,
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    request_id: Arc<AtomicU64>,
}

impl CdpPage {
    pub(crate) fn new(
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        request_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            session_id,
            ws_tx,
            pending,
            request_id,
        }
    }

    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, BrowserError> {
        dispatch(
            &self.ws_tx,
            &self.pending,
            &self.request_id,
            method,
            params,
            Some(&self.session_id),
        )
        .await
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), BrowserError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    async fn eval(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(BrowserError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    async fn wait_for_load(&self) -> Result<(), BrowserError> {
        let start = Instant::now();
        loop {
            let state = self.eval("document.readyState").await?;
            if matches!(state.as_str(), Some("complete") | Some("interactive")) {
                return Ok(());
            }
            if start.elapsed() > LOAD_TIMEOUT {
                return Err(BrowserError::Timeout("page load".to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Resolve a selector to a DOM node id; `Ok(None)` when nothing
    /// matches.
    async fn query_node(&self, selector: &str) -> Result<Option<i64>, BrowserError> {
        let doc = self.call("DOM.getDocument", Some(json!({"depth": 0}))).await?;
        let root_id = doc["root"]["nodeId"].as_i64().unwrap_or(0);

        let result = self
            .call(
                "DOM.querySelector",
                Some(json!({ "nodeId": root_id, "selector": selector })),
            )
            .await?;

        match result["nodeId"].as_i64() {
            Some(0) | None => Ok(None),
            Some(id) => Ok(Some(id)),
        }
    }
}

#[async_trait]
impl PageHandle for CdpPage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let result = self
            .call("Page.navigate", Some(json!({ "url": url })))
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(BrowserError::NavigationFailed(error.to_string()));
        }

        self.wait_for_load().await?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        self.eval(script).await
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let outcome = self.eval(&click_script(selector)).await?;
        match outcome.as_str() {
            Some("ok") => Ok(()),
            _ => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }

    async fn set_value(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let outcome = self.eval(&set_value_script(selector, value)).await?;
        match outcome.as_str() {
            Some("ok") => Ok(()),
            _ => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }

    async fn upload_file(&self, selector: &str, path: &Path) -> Result<(), BrowserError> {
        let node_id = self
            .query_node(selector)
            .await?
            .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))?;

        self.call(
            "DOM.setFileInputFiles",
            Some(json!({
                "nodeId": node_id,
                "files": [path.to_string_lossy()],
            })),
        )
        .await
        .map_err(|e| BrowserError::UploadFailed {
            selector: selector.to_string(),
            message: e.to_string(),
        })?;

        debug!("Attached {} to {}", path.display(), selector);
        Ok(())
    }

    async fn screenshot(&self) -> Result<String, BrowserError> {
        let result = self
            .call(
                "Page.captureScreenshot",
                Some(json!({ "format": "jpeg", "quality": 70 })),
            )
            .await
            .map_err(|e| BrowserError::ScreenshotFailed(e.to_string()))?;

        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BrowserError::ScreenshotFailed("missing image data".to_string()))
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), BrowserError> {
        let timeout = Duration::from_millis(timeout_ms);
        let start = Instant::now();
        loop {
            if self.eval(&exists_script(selector)).await? == Value::Bool(true) {
                return Ok(());
            }
            if start.elapsed() > timeout {
                return Err(BrowserError::Timeout(format!("selector '{}'", selector)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn url(&self) -> Result<String, BrowserError> {
        let value = self.eval("window.location.href").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}
