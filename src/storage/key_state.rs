// src/storage/key_state.rs

use crate::core::key_rotation::mask_key;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Represents the state of a single API key
#[derive(Clone, Debug)]
pub struct KeyState {
    pub key: SecretString,
    pub is_active: bool,
    pub failure_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl KeyState {
    /// Create a new, active key state
    pub fn new(key: SecretString) -> Self {
        Self {
            key,
            is_active: true,
            failure_count: 0,
            last_failure_at: None,
            cooldown_until: None,
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.key.expose_secret() == key
    }

    /// Record a quota failure and put the key on cooldown.
    ///
    /// A key that is already inactive gets its window restamped, which keeps
    /// `is_active == false` paired with a cooldown deadline.
    pub fn record_quota_failure(&mut self, now: DateTime<Utc>, cooldown: Duration) {
        self.is_active = false;
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_at = Some(now);
        self.cooldown_until = Some(
            now.checked_add_signed(cooldown)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
    }

    /// Whether an inactive key has served its cooldown.
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        !self.is_active && self.cooldown_until.map_or(true, |until| until <= now)
    }

    /// Make the key selectable again and forget its failures.
    pub fn reactivate(&mut self) {
        self.is_active = true;
        self.failure_count = 0;
        self.cooldown_until = None;
    }

    pub fn view(&self) -> KeyStateView {
        KeyStateView {
            key_preview: mask_key(self.key.expose_secret()),
            is_active: self.is_active,
            failure_count: self.failure_count,
            last_failure_at: self.last_failure_at,
            cooldown_until: self.cooldown_until,
        }
    }
}

/// Masked, serializable snapshot of a `KeyState`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeyStateView {
    pub key_preview: String,
    pub is_active: bool,
    pub failure_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(key: &str) -> KeyState {
        KeyState::new(SecretString::new(key.to_string()))
    }

    #[test]
    fn test_quota_failure_starts_cooldown() {
        let mut s = state("AIzaSyExampleKey0001");
        let now = Utc::now();
        s.record_quota_failure(now, Duration::hours(1));

        assert!(!s.is_active);
        assert_eq!(s.failure_count, 1);
        assert_eq!(s.last_failure_at, Some(now));
        assert_eq!(s.cooldown_until, Some(now + Duration::hours(1)));
    }

    #[test]
    fn test_oversized_cooldown_saturates() {
        let mut s = state("AIzaSyExampleKey0001");
        let now = Utc::now();
        s.record_quota_failure(now, Duration::MAX);

        assert!(!s.is_active);
        assert_eq!(s.cooldown_until, Some(DateTime::<Utc>::MAX_UTC));
        assert!(!s.cooldown_elapsed(now + Duration::days(365)));
    }

    #[test]
    fn test_cooldown_elapsed_boundaries() {
        let mut s = state("AIzaSyExampleKey0001");
        let now = Utc::now();
        assert!(!s.cooldown_elapsed(now), "active keys are never 'cooled down'");

        s.record_quota_failure(now, Duration::hours(1));
        assert!(!s.cooldown_elapsed(now + Duration::minutes(30)));
        assert!(s.cooldown_elapsed(now + Duration::hours(1)));
        assert!(s.cooldown_elapsed(now + Duration::minutes(61)));
    }

    #[test]
    fn test_reactivate_clears_failures_but_keeps_last_failure() {
        let mut s = state("AIzaSyExampleKey0001");
        let now = Utc::now();
        s.record_quota_failure(now, Duration::hours(1));
        s.record_quota_failure(now, Duration::hours(1));
        assert_eq!(s.failure_count, 2);

        s.reactivate();
        assert!(s.is_active);
        assert_eq!(s.failure_count, 0);
        assert!(s.cooldown_until.is_none());
        assert_eq!(s.last_failure_at, Some(now));
    }

    #[test]
    fn test_view_masks_key() {
        let key = "AIzaSyExampleKey0001";
        let view = state(key).view();
        assert_ne!(view.key_preview, key);
        assert!(!view.key_preview.contains(key));
    }
}
