// src/key_manager.rs

use crate::config::AppConfig;
use crate::core::{key_rotation::mask_key, Clock, SystemClock};
use crate::error::Result;
use crate::handlers::{proxy_loop, QuotaExhaustionPolicy, RetryPolicy};
use crate::proxy::{GeminiTransport, ModelRequest, Transport, UpstreamResponse};
use crate::storage::{KeyPool, KeyStateView};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Retry bound and cooldown window for a `KeyRotationClient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSettings {
    pub max_attempts: u32,
    pub cooldown: Duration,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            cooldown: Duration::from_secs(60 * 60),
        }
    }
}

impl From<&crate::config::RotationConfig> for RotationSettings {
    fn from(config: &crate::config::RotationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            cooldown: Duration::from_secs(config.cooldown_secs),
        }
    }
}

/// Read-only snapshot of the pool.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KeyPoolStats {
    pub total_keys: usize,
    pub active_keys: usize,
    pub failed_keys: usize,
    pub current_key_masked: Option<String>,
}

/// Client for a single generative-text API that spreads calls over a pool of
/// credentials and fails over when one runs out of quota.
///
/// The pool lives behind a mutex that is never held across an upstream call,
/// so one client can be shared by concurrent callers.
pub struct KeyRotationClient {
    pool: Mutex<KeyPool>,
    transport: Arc<dyn Transport>,
    policy: Arc<dyn RetryPolicy>,
    clock: Arc<dyn Clock>,
    settings: RotationSettings,
}

impl KeyRotationClient {
    pub fn new(transport: Arc<dyn Transport>, settings: RotationSettings) -> Self {
        Self {
            pool: Mutex::new(KeyPool::new()),
            transport,
            policy: Arc::new(QuotaExhaustionPolicy::default()),
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    /// Builds a client against the real upstream from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport = GeminiTransport::new(&config.upstream)?;
        let client = Self::new(Arc::new(transport), RotationSettings::from(&config.rotation))
            .with_policy(QuotaExhaustionPolicy::new(&config.rotation.quota_patterns))
            .with_keys(&config.rotation.api_keys);

        let stats = client.stats();
        info!(
            pool.total_keys = stats.total_keys,
            rotation.max_attempts = client.settings.max_attempts,
            rotation.cooldown_secs = client.settings.cooldown.as_secs(),
            "Key rotation client initialized"
        );
        Ok(client)
    }

    pub fn with_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Appends keys in order. Blank and duplicate entries are skipped.
    pub fn with_keys<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        {
            let mut pool = self.pool.lock();
            for key in keys {
                pool.push_back(key.as_ref());
            }
        }
        self
    }

    pub fn settings(&self) -> RotationSettings {
        self.settings
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn policy(&self) -> &dyn RetryPolicy {
        self.policy.as_ref()
    }

    fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.settings.cooldown).unwrap_or(chrono::Duration::MAX)
    }

    /// Adds a user-supplied key at the front of the pool and makes it current.
    ///
    /// Blank input and keys already in the pool are ignored. Returns whether the
    /// key was inserted.
    pub fn add_credential(&self, key: &str) -> bool {
        let added = self.pool.lock().push_front(key);
        if added {
            info!(api_key.preview = %mask_key(key.trim()), "Added credential at front of pool");
        }
        added
    }

    /// The key the next call would use. Expired cooldowns are swept first.
    ///
    /// Falls back to the first key when every key is cooling down. `None` only
    /// when the pool is empty.
    pub fn current_key(&self) -> Option<SecretString> {
        self.pool.lock().select(self.clock.now())
    }

    /// Reactivates keys whose cooldown has passed. Returns how many came back.
    pub fn reactivate_expired(&self) -> usize {
        self.pool.lock().reactivate_expired(self.clock.now())
    }

    /// Puts `key` on cooldown and advances the rotation pointer past it.
    ///
    /// Returns `false` for a key that is not in the pool.
    pub fn report_quota_failure(&self, key: &SecretString) -> bool {
        let now = self.clock.now();
        let failures = self
            .pool
            .lock()
            .record_quota_failure(key.expose_secret(), now, self.cooldown());
        match failures {
            Some(failures) => {
                warn!(
                    api_key.preview = %mask_key(key.expose_secret()),
                    failures,
                    cooldown_secs = self.settings.cooldown.as_secs(),
                    "Key deactivated after quota failure"
                );
                true
            }
            None => false,
        }
    }

    /// Sends `request`, failing over across keys on quota errors.
    pub async fn dispatch(&self, request: &ModelRequest) -> Result<UpstreamResponse> {
        proxy_loop::proxy_loop(self, request).await
    }

    /// Makes every key eligible immediately and clears failure counts.
    pub fn reset_all_cooldowns(&self) {
        let mut pool = self.pool.lock();
        pool.reset_all();
        info!(pool.total_keys = pool.len(), "All key cooldowns reset");
    }

    pub fn stats(&self) -> KeyPoolStats {
        let pool = self.pool.lock();
        let total_keys = pool.len();
        let active_keys = pool.active_count();
        let current_key_masked = pool
            .peek_position()
            .map(|position| mask_key(pool.states()[position].key.expose_secret()));
        KeyPoolStats {
            total_keys,
            active_keys,
            failed_keys: total_keys - active_keys,
            current_key_masked,
        }
    }

    /// Masked per-key states in pool order.
    pub fn key_states(&self) -> Vec<KeyStateView> {
        self.pool.lock().states().iter().map(|s| s.view()).collect()
    }
}

impl std::fmt::Debug for KeyRotationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRotationClient")
            .field("stats", &self.stats())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
