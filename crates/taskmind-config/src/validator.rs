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

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration shape.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_browser(config, &mut result);
        Self::validate_commands(config, &mut result);
        Self::validate_server(config, &mut result);
        Self::validate_recipes(config, &mut result);

        Ok(result)
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        if let Err(ConfigError::InvalidValue { field, message }) = config.browser.validate() {
            result.add_error(ValidationError::new(field, message));
        }

        if config.browser.max_reconnect_attempts == 0 {
            result.add_warning(ValidationWarning::new(
                "browser.max_reconnect_attempts",
                "reconnection is disabled; a dropped socket will end the session",
            ));
        }

        if config.browser.websocket_url.is_some() && config.browser.target_id.is_some() {
            result.add_warning(ValidationWarning::new(
                "browser.target_id",
                "target_id is ignored when websocket_url is set",
            ));
        }
    }

    fn validate_commands(config: &Config, result: &mut ValidationResult) {
        let commands = &config.commands;
        if commands.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "commands.poll_interval_ms",
                "poll interval must be greater than 0",
            ));
        }
        if commands.navigation_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "commands.navigation_timeout_ms",
                "navigation timeout must be greater than 0",
            ));
        }
        if !(commands.max_zoom > 0.0) {
            result.add_error(ValidationError::new(
                "commands.max_zoom",
                "max_zoom must be positive",
            ));
        }
        if commands.poll_interval_ms > commands.element_poll_window_ms {
            result.add_warning(ValidationWarning::new(
                "commands.poll_interval_ms",
                "poll interval is longer than the element poll window; only one probe will run",
            ));
        }
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }
        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
        if config.server.startup_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "server.startup_timeout_ms",
                "startup window must be greater than 0",
            ));
        }
    }

    fn validate_recipes(config: &Config, result: &mut ValidationResult) {
        if !config.recipes.user_dir.exists() {
            result.add_warning(ValidationWarning::new(
                "recipes.user_dir",
                format!(
                    "Recipe directory does not exist: {}",
                    config.recipes.user_dir.display()
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
