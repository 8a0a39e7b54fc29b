// src/middleware/admin_auth.rs

use crate::{error::AppError, state::AppState};
use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Constant-time string comparison to prevent timing attacks
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }
    result == 0
}

/// Requires `Authorization: Bearer <admin_token>` on admin routes.
/// With no token configured every request is rejected.
pub async fn admin_auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state
        .config
        .server
        .admin_token
        .as_deref()
        .filter(|t| !t.is_empty());

    let Some(expected) = expected else {
        warn!("Admin request rejected: no admin token configured");
        return Err(AppError::Unauthorized);
    };

    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if secure_compare(token.trim(), expected) => {
            debug!("Admin authentication successful");
            Ok(next.run(req).await)
        }
        _ => {
            warn!("Admin authentication failed: invalid or missing token");
            Err(AppError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::secure_compare;

    #[test]
    fn test_secure_compare() {
        assert!(secure_compare("token", "token"));
        assert!(!secure_compare("token", "tokem"));
        assert!(!secure_compare("token", "token-longer"));
    }
}
