//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub fill: FillConfig,

    #[serde(default)]
    pub cost: CostConfig,

    #[serde(default)]
    pub captcha: CaptchaConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Browser connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// DevTools HTTP endpoint of a running Chrome instance.
    #[serde(default = "default_cdp_url")]
    pub cdp_url: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound for selector waits during replay.
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            cdp_url: default_cdp_url(),
            connect_timeout_secs: default_connect_timeout(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

fn default_cdp_url() -> String {
    "http://127.0.0.1:9222".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

/// Completion provider configuration, keyed by provider id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Generation call configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Provider id used for response generation and vision recovery.
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Vision recovery calls get more headroom than plain generation.
    #[serde(default = "default_vision_timeout")]
    pub vision_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
            vision_timeout_secs: default_vision_timeout(),
        }
    }
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.2
}

fn default_generation_timeout() -> u64 {
    90
}

fn default_vision_timeout() -> u64 {
    120
}

/// Fill pass configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillConfig {
    /// Minimum fill rate for a partially failed pass to still count as a
    /// success (remaining failures must all be file-related).
    #[serde(default = "default_success_threshold")]
    pub success_threshold: f64,

    /// Jitter band between fields, milliseconds. Equal bounds of zero
    /// disable pacing.
    #[serde(default = "default_pacing_min")]
    pub pacing_min_ms: u64,

    #[serde(default = "default_pacing_max")]
    pub pacing_max_ms: u64,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            success_threshold: default_success_threshold(),
            pacing_min_ms: default_pacing_min(),
            pacing_max_ms: default_pacing_max(),
        }
    }
}

fn default_success_threshold() -> f64 {
    0.70
}

fn default_pacing_min() -> u64 {
    150
}

fn default_pacing_max() -> u64 {
    450
}

/// Relative cost model of the replay and recording paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    #[serde(default = "default_replay_cost")]
    pub replay_cost: f64,

    #[serde(default = "default_recording_cost")]
    pub recording_cost: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            replay_cost: default_replay_cost(),
            recording_cost: default_recording_cost(),
        }
    }
}

fn default_replay_cost() -> f64 {
    0.05
}

fn default_recording_cost() -> f64 {
    0.80
}

/// CAPTCHA handling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    /// Continue past an unsolved captcha instead of failing the attempt.
    /// Intended for sandboxed runs against fixture pages only.
    #[serde(default)]
    pub allow_unsolved: bool,

    /// Optional external solver service endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver_url: Option<String>,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            allow_unsolved: false,
            solver_url: None,
        }
    }
}

/// Recipe store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".formpilot")
        .join("recipes.db")
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
