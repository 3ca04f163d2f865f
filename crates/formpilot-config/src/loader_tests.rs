use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::*;

#[test]
fn test_load_empty_config_is_all_defaults() {
    let config = ConfigLoader::load_str("").unwrap();
    assert_eq!(config.browser.cdp_url, "http://127.0.0.1:9222");
    assert!((config.fill.success_threshold - 0.70).abs() < f64::EPSILON);
}

#[test]
fn test_load_basic_config() {
    let content = r#"
        [browser]
        cdp_url = "http://localhost:9333"
    "#;
    let config = ConfigLoader::load_str(content).unwrap();
    assert_eq!(config.browser.cdp_url, "http://localhost:9333");
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[fill]").unwrap();
    writeln!(file, "success_threshold = 0.85").unwrap();

    let config = ConfigLoader::load(file.path()).unwrap();
    assert!((config.fill.success_threshold - 0.85).abs() < f64::EPSILON);
}

#[test]
fn test_load_nonexistent_file() {
    let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
    assert!(result.is_err());
}

#[test]
fn test_load_invalid_toml() {
    let result = ConfigLoader::load_str("invalid = [unclosed");
    assert!(result.is_err());
}

#[test]
fn test_substitute_env_vars() {
    std::env::set_var("FORMPILOT_TEST_KEY", "sk-from-env");
    let content = "[providers.anthropic]\napi_key = \"${FORMPILOT_TEST_KEY}\"";
    let config = ConfigLoader::load_str(content).unwrap();
    assert_eq!(
        config.providers["anthropic"].api_key.as_deref(),
        Some("sk-from-env")
    );
    std::env::remove_var("FORMPILOT_TEST_KEY");
}

#[test]
fn test_substitute_env_vars_not_set() {
    let content = "value = \"${FORMPILOT_NONEXISTENT_VAR_12345}\"";
    let result = ConfigLoader::load_str(content);
    match result {
        Err(ConfigError::EnvVarNotSet(name)) => {
            assert_eq!(name, "FORMPILOT_NONEXISTENT_VAR_12345");
        }
        other => panic!("expected EnvVarNotSet, got {:?}", other),
    }
}

#[test]
fn test_expand_path_with_tilde() {
    let expanded = ConfigLoader::expand_path("~/resume.pdf");
    assert!(!expanded.starts_with('~'));
    assert!(expanded.ends_with("/resume.pdf"));
}

#[test]
fn test_expand_path_no_tilde() {
    let path = "/srv/profiles/ada.json";
    assert_eq!(ConfigLoader::expand_path(path), path);
}
