//! Browser control collaborator trait.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BrowserError;

/// One live browser page owned by a single attempt.
///
/// All operations are I/O-bound round trips; dropping the handle abandons
/// the attempt without rolling back already-applied field values.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigate the page and wait for load.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Evaluate a JavaScript expression, returning its JSON value.
    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError>;

    /// Click the first element matching the selector.
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Set an input's value and fire the input/change events reactive
    /// handlers listen for.
    async fn set_value(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    /// Attach a local file to a file input.
    async fn upload_file(&self, selector: &str, path: &Path) -> Result<(), BrowserError>;

    /// Capture a viewport screenshot as base64 JPEG.
    async fn screenshot(&self) -> Result<String, BrowserError>;

    /// Wait until the selector matches a visible element, or time out.
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), BrowserError>;

    /// Current page URL.
    async fn url(&self) -> Result<String, BrowserError>;
}
