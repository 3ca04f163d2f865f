//! Anthropic provider implementation.

use async_trait::async_trait;
use tracing::debug;

use formpilot_protocols::{CompletionOptions, CompletionProvider, ProviderError, VisionProvider};

use crate::api::{ApiContent, ApiMessage, ApiRequest, ApiResponse, ContentBlock, ImageSource};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

const JSON_SYSTEM_PROMPT: &str =
    "Respond with a single JSON object only. No markdown fences, no commentary.";

/// Completion and vision backend over the Anthropic Messages API.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API base URL (self-hosted gateways, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, content: ApiContent, options: &CompletionOptions) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content,
            }],
            system: options.json_mode.then(|| JSON_SYSTEM_PROMPT.to_string()),
            max_tokens: options.max_tokens,
            temperature: Some(options.temperature),
        }
    }

    async fn send(
        &self,
        api_request: &ApiRequest,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .timeout(options.timeout)
            .json(api_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(options.timeout.as_secs())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            // Anthropic error JSON: {"error": {"message": "...", "type": "..."}}
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or(body);

            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationFailed(message),
                429 => ProviderError::RateLimited {
                    retry_after_seconds: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
                },
                400 => ProviderError::InvalidRequest(message),
                code => ProviderError::ApiError {
                    status: code,
                    message,
                },
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        debug!(
            id = %api_response.id,
            model = %api_response.model,
            input_tokens = api_response.usage.input_tokens,
            output_tokens = api_response.usage.output_tokens,
            stop_reason = ?api_response.stop_reason,
            "Completion finished"
        );

        let text = api_response.text();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let request = self.build_request(ApiContent::Text(prompt.to_string()), options);
        self.send(&request, options).await
    }
}

#[async_trait]
impl VisionProvider for AnthropicProvider {
    async fn generate_with_image(
        &self,
        prompt: &str,
        image_base64: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let content = ApiContent::Blocks(vec![
            ContentBlock::Image {
                source: ImageSource::base64_jpeg(image_base64),
            },
            ContentBlock::Text {
                text: prompt.to_string(),
            },
        ]);
        let request = self.build_request(content, options);
        self.send(&request, options).await
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
