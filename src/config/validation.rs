// src/config/validation.rs

use crate::config::AppConfig;
use crate::core::key_rotation::mask_key;
use crate::error::{AppError, Result};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Longest accepted cooldown window: 30 days.
pub const MAX_COOLDOWN_SECS: u64 = 30 * 24 * 60 * 60;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> Result<()> {
        debug!("Starting configuration validation");

        if let Err(e) = Self::validate_rotation(config) {
            warn!("Rotation config validation failed: {}", e);
            return Err(e);
        }

        if let Err(e) = Self::validate_upstream(config) {
            warn!("Upstream config validation failed: {}", e);
            return Err(e);
        }

        debug!("Configuration validation completed successfully");
        Ok(())
    }

    fn validate_rotation(config: &AppConfig) -> Result<()> {
        let rotation = &config.rotation;

        if rotation.max_attempts == 0 {
            return Err(AppError::config_validation(
                "At least one attempt per request is required",
                Some("rotation.max_attempts"),
            ));
        }

        if rotation.cooldown_secs == 0 {
            return Err(AppError::config_validation(
                "Cooldown cannot be 0",
                Some("rotation.cooldown_secs"),
            ));
        }

        if rotation.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(AppError::config_validation(
                format!("Cooldown cannot exceed {MAX_COOLDOWN_SECS} seconds"),
                Some("rotation.cooldown_secs"),
            ));
        }

        let mut seen = HashSet::new();
        for key in &rotation.api_keys {
            let key = key.trim();
            if key.is_empty() {
                warn!("Ignoring blank entry in rotation.api_keys");
                continue;
            }
            if !seen.insert(key) {
                return Err(AppError::config_validation(
                    format!("Duplicate API key: {}", mask_key(key)),
                    Some("rotation.api_keys"),
                ));
            }
        }

        if seen.is_empty() {
            // Keys can still be added at runtime; dispatch reports the empty pool.
            warn!("No API keys configured. Requests will fail until a key is added.");
        }

        Ok(())
    }

    fn validate_upstream(config: &AppConfig) -> Result<()> {
        let upstream = &config.upstream;

        let url = Url::parse(&upstream.base_url).map_err(|e| {
            AppError::config_validation(
                format!("Invalid URL: {} - {}", upstream.base_url, e),
                Some("upstream.base_url"),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::config_validation(
                format!("Unsupported scheme '{}'. Supported: http, https", url.scheme()),
                Some("upstream.base_url"),
            ));
        }

        if upstream.api_version.trim().is_empty() {
            return Err(AppError::config_validation(
                "API version cannot be empty",
                Some("upstream.api_version"),
            ));
        }

        if upstream.connect_timeout_secs == 0 {
            return Err(AppError::config_validation(
                "Connect timeout cannot be 0",
                Some("upstream.connect_timeout_secs"),
            ));
        }

        if upstream.request_timeout_secs == 0 {
            return Err(AppError::config_validation(
                "Request timeout cannot be 0",
                Some("upstream.request_timeout_secs"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys(keys: &[&str]) -> AppConfig {
        let mut config = AppConfig::default();
        config.rotation.api_keys = keys.iter().map(|k| k.to_string()).collect();
        config
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_keys_rejected_without_leaking_key() {
        let config = config_with_keys(&["AIzaSyDuplicateKey000", " AIzaSyDuplicateKey000 "]);
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(err, AppError::ConfigValidation { ref field, .. } if field == "rotation.api_keys"));
        assert!(!err.to_string().contains("AIzaSyDuplicateKey000"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = config_with_keys(&["k1"]);
        config.rotation.max_attempts = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_zero_cooldown_rejected() {
        let mut config = config_with_keys(&["k1"]);
        config.rotation.cooldown_secs = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_oversized_cooldown_rejected() {
        let mut config = config_with_keys(&["k1"]);
        config.rotation.cooldown_secs = MAX_COOLDOWN_SECS;
        assert!(ConfigValidator::validate(&config).is_ok());

        config.rotation.cooldown_secs = 10_000_000_000_000;
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(err, AppError::ConfigValidation { ref field, .. } if field == "rotation.cooldown_secs"));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = config_with_keys(&["k1"]);
        config.upstream.base_url = "not a url".to_string();
        assert!(ConfigValidator::validate(&config).is_err());

        config.upstream.base_url = "ftp://example.com".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = config_with_keys(&["k1"]);
        config.upstream.request_timeout_secs = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
