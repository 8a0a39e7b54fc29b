// src/handler.rs

use crate::{
    error::{AppError, Result},
    proxy::ModelRequest,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const GENERATE_CONTENT_ACTION: &str = "generateContent";

#[derive(Serialize, Debug)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// `POST /v1beta/models/{model}:generateContent`, forwarded through the key pool.
pub async fn generate_content(
    State(state): State<Arc<AppState>>,
    Path(target): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse> {
    let (model, action) = target
        .split_once(':')
        .ok_or_else(|| AppError::NotFound(format!("models/{target}")))?;
    if action != GENERATE_CONTENT_ACTION {
        return Err(AppError::NotFound(format!("models/{target}")));
    }
    if model.trim().is_empty() {
        return Err(AppError::InvalidRequest("model name is empty".to_string()));
    }
    if !payload.is_object() {
        return Err(AppError::InvalidRequest(
            "request body must be a JSON object".to_string(),
        ));
    }

    debug!(model, "Dispatching generateContent request");
    let response = state
        .client
        .dispatch(&ModelRequest::new(model, payload))
        .await?;

    Ok((response.status, Json(response.body)))
}
