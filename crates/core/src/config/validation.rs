//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - a passthrough pattern is not a valid regular expression
    /// - a seed URL is empty or cannot be resolved against `origin`
    ///
    /// Returns `ConfigError::Missing` if the generation id or fallback
    /// document is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        for pattern in &self.passthrough_patterns {
            regex::Regex::new(pattern).map_err(|e| invalid("passthrough_patterns", e.to_string()))?;
        }

        let deployment = &self.deployment;
        if deployment.generation_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "deployment.generation_id".into(),
                hint: "Set SHELLCACHE_DEPLOYMENT__GENERATION_ID environment variable".into(),
            });
        }
        if deployment.fallback_document.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "deployment.fallback_document".into(),
                hint: "Set SHELLCACHE_DEPLOYMENT__FALLBACK_DOCUMENT environment variable".into(),
            });
        }

        for seed in &deployment.seed_urls {
            if seed.trim().is_empty() {
                return Err(invalid("deployment.seed_urls", "entries must not be empty"));
            }
            origin
                .join(seed)
                .map_err(|e| invalid("deployment.seed_urls", format!("{seed}: {e}")))?;
        }

        if !deployment.seed_urls.contains(&deployment.fallback_document) {
            tracing::warn!(
                fallback = %deployment.fallback_document,
                generation = %deployment.generation_id,
                "fallback document is not in the seed list; offline navigations may get the placeholder"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeploymentConfig, ShellApp};

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_all_presets() {
        for app in [ShellApp::Admin, ShellApp::Student, ShellApp::Trainer] {
            assert!(AppConfig::for_app(app).validate().is_ok(), "{app:?}");
        }
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_origin() {
        let relative = AppConfig { origin: "/admin".into(), ..Default::default() };
        assert!(matches!(relative.validate(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));

        let ftp = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(ftp.validate(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_bad_pattern() {
        let config = AppConfig { passthrough_patterns: vec!["script(".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "passthrough_patterns"));
    }

    #[test]
    fn test_validate_missing_generation() {
        let config = AppConfig {
            deployment: DeploymentConfig { generation_id: " ".into(), ..Default::default() },
            ..Default::default()
        };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "deployment.generation_id"));
    }

    #[test]
    fn test_validate_empty_seed() {
        let config = AppConfig {
            deployment: DeploymentConfig { seed_urls: vec!["/admin/".into(), String::new()], ..Default::default() },
            ..Default::default()
        };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "deployment.seed_urls"));
    }

    #[test]
    fn test_validate_fallback_outside_seeds_is_allowed() {
        let config = AppConfig {
            deployment: DeploymentConfig { fallback_document: "/offline.html".into(), ..Default::default() },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
