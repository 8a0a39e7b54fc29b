// src/config/loader.rs

use crate::config::{AppConfig, ConfigValidator};
use crate::error::{AppError, Result};
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from file, apply environment overrides and validate.
pub fn load_config(config_path: &Path) -> Result<AppConfig> {
    let mut config = if config_path.exists() {
        info!("Loading configuration from file: {}", config_path.display());
        load_from_file(config_path)?
    } else {
        info!("Configuration file not found, using defaults");
        AppConfig::default()
    };

    override_with_env(&mut config);

    ConfigValidator::validate(&config)?;

    debug!("Configuration loaded and validated successfully");
    Ok(config)
}

fn load_from_file(config_path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(config_path)?;

    serde_yaml::from_str(&content).map_err(|e| AppError::ConfigParse {
        message: format!("Failed to parse config file: {e}"),
        line: e.location().map(|loc| loc.line()),
    })
}

fn override_with_env(config: &mut AppConfig) {
    if let Ok(port_str) = std::env::var("PORT") {
        if let Ok(port) = port_str.parse::<u16>() {
            info!("Overriding server port from environment variable: {}", port);
            config.server.port = port;
        } else {
            warn!("Invalid PORT environment variable: {}", port_str);
        }
    }

    if let Ok(token) = std::env::var("ADMIN_TOKEN") {
        if !token.trim().is_empty() {
            info!("Overriding admin token from environment variable");
            config.server.admin_token = Some(token);
        }
    }

    // Extra pool keys go to the back, in the order given.
    if let Ok(keys) = std::env::var("GEMINI_API_KEYS") {
        let mut added = 0;
        for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            if !config.rotation.api_keys.iter().any(|k| k.trim() == key) {
                config.rotation.api_keys.push(key.to_string());
                added += 1;
            }
        }
        info!(added, "Appended API keys from GEMINI_API_KEYS");
    }

    // A personal key takes priority over the pool, like a runtime add.
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        let key = key.trim();
        if !key.is_empty() && !config.rotation.api_keys.iter().any(|k| k.trim() == key) {
            info!("Prepending API key from GEMINI_API_KEY");
            config.rotation.api_keys.insert(0, key.to_string());
        }
    }
}

/// Save configuration to file.
pub async fn save_config(config: &AppConfig, config_path: &Path) -> Result<()> {
    let yaml_content = serde_yaml::to_string(config)
        .map_err(|e| AppError::Config(format!("Failed to serialize config: {e}")))?;

    tokio::fs::write(config_path, yaml_content).await?;

    info!("Configuration saved to: {}", config_path.display());
    Ok(())
}
