//! TOML loading with `${VAR}` environment substitution.

use std::fs;
use std::path::Path;

use regex::{Captures, Regex};

use crate::error::ConfigError;
use crate::schema::Config;

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;

/// Reads config files. Values may reference environment variables as
/// `${VAR}`; an unset variable is a load error, never an empty string.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        Self::load_str(&fs::read_to_string(path)?)
    }

    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(&substitute_env(content)?)?)
    }

    /// Tilde-expand user-supplied paths (`~/resume.pdf`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

fn substitute_env(content: &str) -> Result<String, ConfigError> {
    let mut unset = None;
    let expanded = env_marker_re().replace_all(content, |caps: &Captures| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                unset.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match unset {
        Some(name) => Err(ConfigError::EnvVarNotSet(name)),
        None => Ok(expanded.into_owned()),
    }
}

fn env_marker_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{(\w+)\}").expect("env marker regex"))
}
