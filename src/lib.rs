// src/lib.rs

pub mod admin;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod key_manager;
pub mod middleware;
pub mod proxy;
pub mod state;
pub mod storage;

use crate::handler::{generate_content, health_check};
use axum::{
    body::Body,
    http::{HeaderValue, Request as AxumRequest},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::{path::PathBuf, sync::Arc, time::Instant};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use key_manager::{KeyPoolStats, KeyRotationClient, RotationSettings};
pub use proxy::{GeminiTransport, ModelRequest, Transport, UpstreamResponse};
pub use state::AppState;

/// Builds the Axum router: health, the generateContent passthrough and the admin routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1beta/models/:target", post(generate_content))
        .merge(admin::admin_routes(state.clone()))
        .with_state(state)
}

/// Adds a request ID to every request and logs its outcome.
async fn trace_requests(
    mut req: AxumRequest<Body>,
    next: axum::middleware::Next,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        http.method = %method,
        url.path = %path,
    );

    req.extensions_mut().insert(request_id);

    async move {
        let mut response = next.run(req).await;
        let elapsed = start_time.elapsed();

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert("X-Request-ID", value);
        }

        info!(
            http.response.duration = ?elapsed,
            http.status_code = response.status().as_u16(),
            "Finished processing request"
        );

        response
    }
    .instrument(span)
    .await
}

/// Loads configuration, builds the shared state and returns the ready router.
pub fn run(config_path_override: Option<PathBuf>) -> Result<(Router, AppConfig)> {
    info!("Starting Gemini key rotation service...");

    let app_config = setup_configuration(config_path_override)?;
    let app_state = AppState::new(&app_config).map_err(|e| {
        error!(error = ?e, "Failed to initialize application state. Exiting.");
        e
    })?;

    let app = create_router(Arc::new(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(trace_requests));

    Ok((app, app_config))
}

/// Resolves the config path (argument, `CONFIG_PATH`, then `config.yaml`) and loads it.
pub fn setup_configuration(config_path_override: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = config_path_override.unwrap_or_else(|| {
        std::env::var("CONFIG_PATH").map_or_else(|_| PathBuf::from("config.yaml"), PathBuf::from)
    });

    let config_path_display = config_path.display().to_string();
    if config_path.exists() {
        info!(config.path = %config_path_display, "Using configuration file");
    } else {
        info!(config.path = %config_path_display, "Optional configuration file not found. Using defaults and environment variables.");
    }

    let app_config = config::load_config(&config_path).map_err(|e| {
        error!(
            config.path = %config_path_display,
            error = ?e,
            "Failed to load or validate configuration."
        );
        e
    })?;

    let total_keys = app_config
        .rotation
        .api_keys
        .iter()
        .filter(|k| !k.trim().is_empty())
        .count();
    info!(
        config.total_keys = total_keys,
        rotation.max_attempts = app_config.rotation.max_attempts,
        rotation.cooldown_secs = app_config.rotation.cooldown_secs,
        server.port = app_config.server.port,
        "Configuration loaded and validated successfully."
    );

    Ok(app_config)
}
