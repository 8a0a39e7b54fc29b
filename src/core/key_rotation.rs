// src/core/key_rotation.rs

use crate::storage::KeyState;

/// Upper bound on how many leading characters of a credential may be shown.
pub const MAX_VISIBLE_KEY_CHARS: usize = 20;

/// Pool position of the active key the rotation pointer lands on.
///
/// The pointer indexes the active subset and is clamped modulo its current
/// size, so it stays valid however the subset grows or shrinks between calls.
pub fn active_position(states: &[KeyState], rotation_index: usize) -> Option<usize> {
    let active_count = states.iter().filter(|s| s.is_active).count();
    if active_count == 0 {
        return None;
    }
    let target = rotation_index % active_count;
    states
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_active)
        .nth(target)
        .map(|(position, _)| position)
}

/// Rotation index that points at the first active key after `failed_position`
/// in pool order, wrapping to the front.
///
/// Counting the active keys ahead of the failed one gives the index its
/// successor occupies once the failed key has left the active subset.
pub fn successor_index(states: &[KeyState], failed_position: usize) -> usize {
    states
        .iter()
        .take(failed_position)
        .filter(|s| s.is_active)
        .count()
}

/// Masked form of a credential for logs and stats.
///
/// At most half of the key (capped at `MAX_VISIBLE_KEY_CHARS` characters) is
/// shown and an ellipsis is always appended. A key that already ends in an
/// ellipsis shows one character less, so the output never equals the input.
pub fn mask_key(key: &str) -> String {
    let mut visible = (key.chars().count() / 2).min(MAX_VISIBLE_KEY_CHARS);
    if key.chars().count() == visible + 3 && key.ends_with("...") {
        visible = visible.saturating_sub(1);
    }
    let prefix: String = key.chars().take(visible).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use secrecy::SecretString;

    fn pool(keys: &[&str]) -> Vec<KeyState> {
        keys.iter()
            .map(|k| KeyState::new(SecretString::new(k.to_string())))
            .collect()
    }

    #[test]
    fn test_active_position_skips_inactive() {
        let mut states = pool(&["k1", "k2", "k3"]);
        states[0].record_quota_failure(Utc::now(), Duration::hours(1));

        assert_eq!(active_position(&states, 0), Some(1));
        assert_eq!(active_position(&states, 1), Some(2));
        assert_eq!(active_position(&states, 2), Some(1), "index is clamped modulo");
    }

    #[test]
    fn test_active_position_none_when_all_inactive() {
        let mut states = pool(&["k1"]);
        states[0].record_quota_failure(Utc::now(), Duration::hours(1));
        assert_eq!(active_position(&states, 0), None);
        assert_eq!(active_position(&[], 0), None);
    }

    #[test]
    fn test_successor_index_after_failure() {
        let mut states = pool(&["k1", "k2", "k3"]);
        let now = Utc::now();

        states[0].record_quota_failure(now, Duration::hours(1));
        let idx = successor_index(&states, 0);
        assert_eq!(active_position(&states, idx), Some(1));

        // Last key fails: wrap to the front.
        let mut states = pool(&["k1", "k2", "k3"]);
        states[2].record_quota_failure(now, Duration::hours(1));
        let idx = successor_index(&states, 2);
        assert_eq!(active_position(&states, idx), Some(0));
    }

    #[test]
    fn test_mask_key_never_returns_full_key() {
        for key in [
            "a",
            "ab",
            "...",
            "a...",
            "ab...",
            "abc...",
            "abcdefgh",
            "AIzaSyA1b2C3d4E5f6G7h8I9j0KlMnOpQrStUv",
        ] {
            let masked = mask_key(key);
            assert_ne!(masked, key);
            assert!(masked.ends_with("..."));
        }
    }

    #[test]
    fn test_mask_key_caps_visible_prefix() {
        let key = "AIzaSyA1b2C3d4E5f6G7h8I9j0KlMnOpQrStUvWxYz1234";
        assert_eq!(mask_key(key), "AIzaSyA1b2C3d4E5f6G7...");
        assert_eq!(mask_key("abcdefgh"), "abcd...");
        assert_eq!(mask_key("ab..."), "a...");
    }
}
