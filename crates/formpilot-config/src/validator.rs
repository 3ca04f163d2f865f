//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_browser(config, &mut result);
        Self::validate_providers(config, &mut result);
        Self::validate_fill(config, &mut result);
        Self::validate_cost(config, &mut result);
        Self::validate_captcha(config, &mut result);

        Ok(result)
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        if !config.browser.cdp_url.starts_with("http://")
            && !config.browser.cdp_url.starts_with("https://")
        {
            result.add_error(ValidationError::new(
                "browser.cdp_url",
                "cdp_url must start with http:// or https://",
            ));
        }
        if config.browser.wait_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "browser.wait_timeout_ms",
                "wait_timeout_ms must be greater than 0",
            ));
        }
    }

    fn validate_providers(config: &Config, result: &mut ValidationResult) {
        if !config.providers.contains_key(&config.generation.provider) {
            result.add_warning(ValidationWarning::new(
                "generation.provider",
                format!(
                    "Provider '{}' has no [providers.{}] section",
                    config.generation.provider, config.generation.provider
                ),
            ));
        }

        for (name, provider) in &config.providers {
            if provider.api_key.is_none() {
                result.add_warning(ValidationWarning::new(
                    format!("providers.{}.api_key", name),
                    "API key is not set, may need to be set via environment variable",
                ));
            }

            if let Some(ref url) = provider.base_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    result.add_error(ValidationError::new(
                        format!("providers.{}.base_url", name),
                        "base_url must start with http:// or https://",
                    ));
                }
            }
        }
    }

    fn validate_fill(config: &Config, result: &mut ValidationResult) {
        let threshold = config.fill.success_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            result.add_error(ValidationError::new(
                "fill.success_threshold",
                "success_threshold must be between 0.0 and 1.0",
            ));
        }
        if config.fill.pacing_min_ms > config.fill.pacing_max_ms {
            result.add_error(ValidationError::new(
                "fill.pacing_min_ms",
                "pacing_min_ms cannot exceed pacing_max_ms",
            ));
        }
    }

    fn validate_cost(config: &Config, result: &mut ValidationResult) {
        if config.cost.replay_cost < 0.0 || config.cost.recording_cost < 0.0 {
            result.add_error(ValidationError::new(
                "cost",
                "costs cannot be negative",
            ));
        }
        if config.cost.recording_cost <= config.cost.replay_cost {
            result.add_warning(ValidationWarning::new(
                "cost.recording_cost",
                "recording_cost should exceed replay_cost, otherwise recipes never pay off",
            ));
        }
    }

    fn validate_captcha(config: &Config, result: &mut ValidationResult) {
        if config.captcha.allow_unsolved {
            result.add_warning(ValidationWarning::new(
                "captcha.allow_unsolved",
                "Unsolved captchas will not stop attempts; intended for sandboxed runs only",
            ));
        }
        if let Some(ref url) = config.captcha.solver_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "captcha.solver_url",
                    "solver_url must start with http:// or https://",
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
