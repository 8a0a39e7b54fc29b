// src/admin.rs

use crate::{
    key_manager::KeyPoolStats,
    middleware::admin_auth_middleware,
    state::AppState,
    storage::KeyStateView,
};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize, Debug)]
pub struct AddKeyRequest {
    pub key: String,
}

/// Admin routes, nested under `/admin` and guarded by the bearer token.
pub fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new().nest(
        "/admin",
        Router::new()
            .route("/keys", get(list_keys).post(add_key))
            .route("/keys/reset", post(reset_keys))
            .route("/stats", get(get_stats))
            .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware)),
    )
}

/// Lists every key, masked, in pool order.
pub async fn list_keys(State(state): State<Arc<AppState>>) -> Json<Vec<KeyStateView>> {
    Json(state.client.key_states())
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<KeyPoolStats> {
    Json(state.client.stats())
}

/// Adds a key at the front of the pool. `201` when inserted, `200` when it was
/// blank or already present.
pub async fn add_key(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddKeyRequest>,
) -> (StatusCode, Json<KeyPoolStats>) {
    let status = if state.client.add_credential(&request.key) {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(state.client.stats()))
}

pub async fn reset_keys(State(state): State<Arc<AppState>>) -> Json<KeyPoolStats> {
    info!("Admin requested cooldown reset for all keys");
    state.client.reset_all_cooldowns();
    Json(state.client.stats())
}
