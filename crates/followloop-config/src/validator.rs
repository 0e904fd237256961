//! Configuration and settings validation.

use serde_json::Value;
use url::Url;

use followloop_protocols::{Settings, is_valid_username};

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

    /// First error as a [`ConfigError`], if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
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
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_storage(config, &mut result);
        Self::validate_browser(config, &mut result);
        Self::validate_agent(config, &mut result);
        Self::validate_relay(config, &mut result);

        // Defaults go through the same checks as user edits
        let defaults = SettingsValidator::validate(&config.defaults);
        for error in defaults.errors {
            result.add_error(ValidationError::new(
                format!("defaults.{}", error.path),
                error.message,
            ));
        }

        result
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        if config.storage.path.trim().is_empty() {
            result.add_error(ValidationError::new("storage.path", "Storage path cannot be empty"));
        }
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        match Url::parse(&config.browser.endpoint) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => result.add_error(ValidationError::new(
                "browser.endpoint",
                "endpoint must be an http:// or https:// URL",
            )),
        }

        match Url::parse(&config.browser.site_url) {
            Ok(url) => {
                let host = url.host_str().unwrap_or_default();
                if !config
                    .browser
                    .allowed_hosts
                    .iter()
                    .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
                {
                    result.add_warning(ValidationWarning::new(
                        "browser.site_url",
                        format!("Site host '{}' is not in allowed_hosts", host),
                    ));
                }
            }
            Err(e) => result.add_error(ValidationError::new(
                "browser.site_url",
                format!("Invalid site URL: {}", e),
            )),
        }

        if config.browser.allowed_hosts.is_empty() {
            result.add_error(ValidationError::new(
                "browser.allowed_hosts",
                "At least one allowed host is required",
            ));
        }
    }

    fn validate_agent(config: &Config, result: &mut ValidationResult) {
        let agent = &config.agent;
        if agent.max_consecutive_errors == 0 {
            result.add_error(ValidationError::new(
                "agent.max_consecutive_errors",
                "max_consecutive_errors must be greater than 0",
            ));
        }
        if agent.error_log_limit == 0 {
            result.add_error(ValidationError::new(
                "agent.error_log_limit",
                "error_log_limit must be greater than 0",
            ));
        }
        if agent.control_poll_attempts == 0 || agent.status_poll_attempts == 0 {
            result.add_error(ValidationError::new(
                "agent",
                "poll attempt counts must be greater than 0",
            ));
        }
        if agent.min_navigation_delay_ms < 1000 {
            result.add_warning(ValidationWarning::new(
                "agent.min_navigation_delay_ms",
                "Navigation delays under one second are easy to detect",
            ));
        }
    }

    fn validate_relay(config: &Config, result: &mut ValidationResult) {
        if config.relay.max_attempts == 0 {
            result.add_error(ValidationError::new(
                "relay.max_attempts",
                "max_attempts must be greater than 0",
            ));
        }
        if config.relay.long_response_timeout_ms < config.relay.response_timeout_ms {
            result.add_warning(ValidationWarning::new(
                "relay.long_response_timeout_ms",
                "long_response_timeout_ms is shorter than response_timeout_ms",
            ));
        }
    }
}

/// Validates user-supplied settings before they reach the store.
pub struct SettingsValidator;

impl SettingsValidator {
    /// Check every field against its accepted range.
    pub fn validate(settings: &Settings) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::check_range(&mut result, "dailyFollowLimit", settings.daily_follow_limit.into(), 1, 500);
        Self::check_range(&mut result, "followInterval", settings.follow_interval, 4, 3600);
        Self::check_range(&mut result, "unfollowDays", settings.unfollow_days.into(), 1, 90);
        if let Some(secs) = settings.unfollow_seconds {
            Self::check_range(&mut result, "unfollowSeconds", secs, 0, 3600);
        }
        Self::check_range(&mut result, "timeVariance", settings.time_variance.into(), 0, 50);
        Self::check_range(&mut result, "hourlyFollowLimit", settings.hourly_follow_limit.into(), 0, 100);
        Self::check_range(&mut result, "maxActionsSession", settings.max_actions_session.into(), 0, 1000);
        Self::check_range(&mut result, "minThinkingTime", settings.min_thinking_time, 0, 2000);
        Self::check_range(
            &mut result,
            "maxThinkingTime",
            settings.max_thinking_time,
            settings.min_thinking_time,
            3000,
        );

        if !settings.any_mode_enabled() {
            result.add_warning(ValidationWarning::new(
                "enableAutoFollow",
                "Both auto-follow and auto-unfollow are disabled; the agent will refuse to start",
            ));
        }

        result
    }

    /// Return a copy of `settings` with `key` (camelCase) set from `raw`, validated.
    pub fn apply(settings: &Settings, key: &str, raw: &str) -> Result<Settings, ConfigError> {
        let mut value = serde_json::to_value(settings).map_err(|e| ConfigError::InvalidValue {
            field: key.to_string(),
            message: e.to_string(),
        })?;

        let known = [
            "dailyFollowLimit",
            "hourlyFollowLimit",
            "maxActionsSession",
            "followInterval",
            "timeVariance",
            "unfollowDays",
            "unfollowSeconds",
            "minThinkingTime",
            "maxThinkingTime",
            "enableAutoFollow",
            "enableAutoUnfollow",
        ];
        if !known.contains(&key) {
            return Err(ConfigError::UnknownSetting(key.to_string()));
        }

        let parsed = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        if let Some(map) = value.as_object_mut() {
            map.insert(key.to_string(), parsed);
        }

        let updated: Settings =
            serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
                field: key.to_string(),
                message: e.to_string(),
            })?;
        Self::validate(&updated).into_result()?;
        Ok(updated)
    }

    /// Reject handles that cannot exist on the target site.
    pub fn validate_username(username: &str) -> Result<(), ConfigError> {
        if is_valid_username(username) {
            Ok(())
        } else {
            Err(ConfigError::InvalidValue {
                field: "username".to_string(),
                message: format!(
                    "'{}' must be 1-15 letters, digits or underscores",
                    username
                ),
            })
        }
    }

    fn check_range(result: &mut ValidationResult, field: &str, value: u64, min: u64, max: u64) {
        if value < min || value > max {
            result.add_error(ValidationError::new(
                field,
                format!("must be between {} and {} (got {})", min, max, value),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
