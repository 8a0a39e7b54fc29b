// src/storage/memory.rs

use crate::core::key_rotation::{active_position, successor_index};
use crate::storage::KeyState;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use tracing::{debug, trace};

/// Process-local pool of credentials with a rotation pointer.
///
/// Keys are never removed; they only move between active and cooling down.
#[derive(Debug, Default)]
pub struct KeyPool {
    keys: Vec<KeyState>,
    rotation_index: usize,
}

impl KeyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pool in the given order, skipping blank and duplicate entries.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pool = Self::new();
        for key in keys {
            pool.push_back(key.as_ref());
        }
        pool
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position_of(key).is_some()
    }

    pub fn states(&self) -> &[KeyState] {
        &self.keys
    }

    pub fn active_count(&self) -> usize {
        self.keys.iter().filter(|s| s.is_active).count()
    }

    fn position_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|s| s.matches(key))
    }

    /// Inserts `key` at the front and makes it current.
    ///
    /// Returns `false` without touching the selection when the key is blank
    /// or already present.
    pub fn push_front(&mut self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() || self.contains(key) {
            return false;
        }
        self.keys
            .insert(0, KeyState::new(SecretString::new(key.to_string())));
        // The new key is active and first in pool order, so it is active index 0.
        self.rotation_index = 0;
        true
    }

    /// Appends `key` behind the existing ones. Blank and duplicate keys are ignored.
    pub fn push_back(&mut self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() || self.contains(key) {
            return false;
        }
        self.keys
            .push(KeyState::new(SecretString::new(key.to_string())));
        true
    }

    /// Reactivates every inactive key whose cooldown has passed.
    pub fn reactivate_expired(&mut self, now: DateTime<Utc>) -> usize {
        let mut reactivated = 0;
        for state in self.keys.iter_mut().filter(|s| s.cooldown_elapsed(now)) {
            state.reactivate();
            reactivated += 1;
        }
        if reactivated > 0 {
            debug!(reactivated, "Reactivated keys whose cooldown expired");
        }
        reactivated
    }

    /// Pool position of the key a caller should use right now, without side effects.
    ///
    /// Falls back to the first key when none is active.
    pub fn peek_position(&self) -> Option<usize> {
        if self.keys.is_empty() {
            return None;
        }
        Some(active_position(&self.keys, self.rotation_index).unwrap_or(0))
    }

    /// Selects the current key.
    ///
    /// Expired cooldowns are swept first. If nothing is active afterwards, the
    /// first key is returned anyway (degraded mode). `None` only for an empty
    /// pool.
    pub fn select(&mut self, now: DateTime<Utc>) -> Option<SecretString> {
        if self.keys.is_empty() {
            return None;
        }
        self.reactivate_expired(now);
        let position = match active_position(&self.keys, self.rotation_index) {
            Some(position) => position,
            None => {
                trace!("No active keys after sweep; using the first key");
                0
            }
        };
        Some(self.keys[position].key.clone())
    }

    /// Puts `key` on cooldown and moves the pointer to its successor.
    ///
    /// Returns the updated failure count, or `None` if the key is unknown.
    pub fn record_quota_failure(
        &mut self,
        key: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Option<u32> {
        let position = self.position_of(key)?;
        let state = &mut self.keys[position];
        state.record_quota_failure(now, cooldown);
        let failures = state.failure_count;
        self.rotation_index = successor_index(&self.keys, position);
        Some(failures)
    }

    /// Reactivates every key regardless of its cooldown.
    pub fn reset_all(&mut self) {
        for state in &mut self.keys {
            state.reactivate();
        }
    }
}
