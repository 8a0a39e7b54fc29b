// src/state.rs

use crate::config::AppConfig;
use crate::error::Result;
use crate::key_manager::KeyRotationClient;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared state handed to every Axum handler.
#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub client: Arc<KeyRotationClient>,
    pub start_time: Instant,
}

impl AppState {
    /// Builds the rotation client against the configured upstream.
    pub fn new(config: &AppConfig) -> Result<Self> {
        info!("Creating shared AppState: initializing key rotation client...");
        let client = KeyRotationClient::from_config(config)?;
        Ok(Self::with_client(config.clone(), Arc::new(client)))
    }

    /// Wraps an already-built client, e.g. one pointed at a mock upstream.
    pub fn with_client(config: AppConfig, client: Arc<KeyRotationClient>) -> Self {
        Self {
            config,
            client,
            start_time: Instant::now(),
        }
    }
}
