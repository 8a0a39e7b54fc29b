// src/handlers/proxy_loop.rs

use crate::{
    core::key_rotation::mask_key,
    error::{AppError, Result},
    handlers::base::Action,
    key_manager::KeyRotationClient,
    proxy::{ModelRequest, UpstreamResponse},
};
use secrecy::ExposeSecret;
use tracing::{debug, info, instrument, warn};

/// Bounded failover loop behind `KeyRotationClient::dispatch`.
///
/// Attempts run back to back with no delay. Only quota-type failures move on
/// to another key; any other failure is returned on first occurrence and
/// leaves the key untouched. A malformed model name is rejected before any key
/// is selected.
#[instrument(level = "info", skip_all, fields(model = %request.model))]
pub async fn proxy_loop(
    client: &KeyRotationClient,
    request: &ModelRequest,
) -> Result<UpstreamResponse> {
    // Local request errors must not reach the retry policy.
    request.model_id()?;

    let max_attempts = client.settings().max_attempts.max(1);
    client.reactivate_expired();

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;

        let api_key = client.current_key().ok_or_else(|| {
            warn!("No credentials configured; refusing to call upstream");
            AppError::NoCredentials
        })?;
        let preview = mask_key(api_key.expose_secret());
        debug!(api_key.preview = %preview, attempt, max_attempts, "Attempting upstream call");

        let failure = match client.transport().send(request, &api_key).await {
            Ok(response) => {
                info!(
                    api_key.preview = %preview,
                    attempt,
                    status = response.status.as_u16(),
                    "Upstream call succeeded"
                );
                return Ok(response);
            }
            Err(failure) => failure,
        };

        match client.policy().classify(&failure) {
            Action::Terminal => {
                warn!(
                    api_key.preview = %preview,
                    attempt,
                    status = ?failure.status,
                    "Non-quota upstream failure; not retrying"
                );
                return Err(AppError::Transport(failure));
            }
            Action::RetryNextKey if attempt >= max_attempts => {
                warn!(
                    api_key.preview = %preview,
                    attempts = attempt,
                    "Quota failure on final attempt; retries exhausted"
                );
                return Err(AppError::RetriesExhausted {
                    attempts: attempt,
                    last: failure,
                });
            }
            Action::RetryNextKey => {
                info!(
                    api_key.preview = %preview,
                    attempt,
                    "Quota failure; failing over to next key"
                );
                client.report_quota_failure(&api_key);
            }
        }
    }
}
