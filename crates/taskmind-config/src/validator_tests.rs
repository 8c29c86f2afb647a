use super::*;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
}

#[test]
fn test_validate_invalid_browser_port() {
    let mut config = Config::default();
    config.browser.port = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "browser.port"));
}

#[test]
fn test_validate_zero_poll_interval() {
    let mut config = Config::default();
    config.commands.poll_interval_ms = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "commands.poll_interval_ms"));
}

#[test]
fn test_validate_non_positive_zoom_cap() {
    let mut config = Config::default();
    config.commands.max_zoom = 0.0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "commands.max_zoom"));
}

#[test]
fn test_validate_disabled_reconnect_warning() {
    let mut config = Config::default();
    config.browser.max_reconnect_attempts = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.path == "browser.max_reconnect_attempts"));
}

#[test]
fn test_validate_invalid_server_port() {
    let mut config = Config::default();
    config.server.port = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
}

#[test]
fn test_validation_result_default() {
    let result = ValidationResult::default();
    assert!(result.is_valid());
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
}
