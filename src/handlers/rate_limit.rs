// src/handlers/rate_limit.rs

use super::base::{RetryPolicy, UpstreamFailure};
use http::StatusCode;

/// Body fragments that mark a quota or rate-limit rejection.
pub const DEFAULT_QUOTA_PATTERNS: &[&str] = &[
    "quota exceeded",
    "rate limit",
    "too many requests",
    "resource_exhausted",
];

/// Treats HTTP 429, or any failure whose text mentions one of the configured
/// patterns (case-insensitive), as quota exhaustion.
#[derive(Debug, Clone)]
pub struct QuotaExhaustionPolicy {
    patterns: Vec<String>,
}

impl QuotaExhaustionPolicy {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for QuotaExhaustionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA_PATTERNS)
    }
}

impl RetryPolicy for QuotaExhaustionPolicy {
    fn is_retryable(&self, failure: &UpstreamFailure) -> bool {
        if failure.status == Some(StatusCode::TOO_MANY_REQUESTS) {
            return true;
        }
        let message = failure.message.to_lowercase();
        self.patterns.iter().any(|p| message.contains(p.as_str()))
    }
}
