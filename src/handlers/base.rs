// src/handlers/base.rs

use http::StatusCode;
use std::fmt;

/// A failed upstream attempt, as seen by the retry loop.
///
/// `status` is `None` when no HTTP response was received (connect errors,
/// timeouts). `message` holds the response body or the transport error text
/// and never contains the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    pub status: Option<StatusCode>,
    pub message: String,
}

impl UpstreamFailure {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Wraps a reqwest error with its URL stripped, since the URL may carry the key.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        let status = error.status();
        let message = error.without_url().to_string();
        Self { status, message }
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status.as_u16(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Next step for the retry loop after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The credential hit its quota. Put it on cooldown and try the next one.
    RetryNextKey,
    /// Anything else. Surface the failure to the caller as-is.
    Terminal,
}

/// Decides whether a failure should trigger failover to another credential.
///
/// Implemented for plain closures so callers can plug in their own predicate
/// without a new type.
pub trait RetryPolicy: Send + Sync {
    fn is_retryable(&self, failure: &UpstreamFailure) -> bool;

    fn classify(&self, failure: &UpstreamFailure) -> Action {
        if self.is_retryable(failure) {
            Action::RetryNextKey
        } else {
            Action::Terminal
        }
    }
}

impl<F> RetryPolicy for F
where
    F: Fn(&UpstreamFailure) -> bool + Send + Sync,
{
    fn is_retryable(&self, failure: &UpstreamFailure) -> bool {
        self(failure)
    }
}
