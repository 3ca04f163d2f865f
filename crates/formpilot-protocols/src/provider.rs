//! Completion-service and CAPTCHA-solver collaborator traits.

use std::time::Duration;

use async_trait::async_trait;

use crate::browser::PageHandle;
use crate::error::{CaptchaError, ProviderError};

/// Options for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Request strict JSON output (field-name-keyed, no markdown fences).
    pub json_mode: bool,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Explicit deadline; expiry is surfaced as a generation failure,
    /// never a crash.
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            json_mode: false,
            max_tokens: 2048,
            temperature: 0.2,
            timeout: Duration::from_secs(90),
        }
    }
}

impl CompletionOptions {
    pub fn json() -> Self {
        Self {
            json_mode: true,
            ..Self::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Text completion service.
///
/// Contract: in JSON mode the returned text is a single field-name-keyed
/// JSON object with no markdown fences. Callers still strip fences
/// defensively before parsing.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError>;
}

/// Vision-capable completion service: same JSON contract plus an image
/// attachment (base64 JPEG).
#[async_trait]
pub trait VisionProvider: Send + Sync {
    async fn generate_with_image(
        &self,
        prompt: &str,
        image_base64: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError>;
}

/// External CAPTCHA solving collaborator.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Solve any challenge on the page and inject the token. Returns
    /// whether the page is clear to proceed.
    async fn solve_and_inject(&self, page: &dyn PageHandle) -> Result<bool, CaptchaError>;
}
