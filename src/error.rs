// src/error.rs
use crate::handlers::base::UpstreamFailure;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Structured error body returned by the HTTP surface.
#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Serialize, Debug)]
struct ErrorDetails {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Errors produced by the key pool, the upstream transport and the ambient layers.
///
/// Credentials never appear in any variant: upstream failures carry the status
/// and body text only, and URLs are stripped from reqwest errors before they
/// are wrapped.
#[derive(Error, Debug)]
pub enum AppError {
    /// The pool holds no credentials at all.
    #[error("No API credentials are configured")]
    NoCredentials,

    /// A non-quota failure from the upstream call. Not retried.
    #[error("Upstream transport error: {0}")]
    Transport(UpstreamFailure),

    /// Every attempt failed with a quota-type error.
    #[error("Retries exhausted after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: UpstreamFailure },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String, line: Option<usize> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client build error: {0}")]
    HttpClientBuild(#[source] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn config_validation(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::ConfigValidation {
            field: field.unwrap_or("config").to_string(),
            message: message.into(),
        }
    }

    /// True when the failure was caused by quota exhaustion on every attempt.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    fn to_status_and_details(&self) -> (StatusCode, ErrorDetails) {
        match self {
            // --- 5xx ---
            Self::NoCredentials => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetails {
                    error_type: "NO_CREDENTIALS".to_string(),
                    message: "No API credentials are configured".to_string(),
                    details: None,
                },
            ),
            Self::RetriesExhausted { attempts, last } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetails {
                    error_type: "RETRIES_EXHAUSTED".to_string(),
                    message: "Service overloaded, try again later".to_string(),
                    details: Some(format!("{attempts} attempt(s), last error: {last}")),
                },
            ),
            Self::Transport(failure) => {
                error!(status = ?failure.status, "Upstream transport error: {}", failure.message);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorDetails {
                        error_type: "UPSTREAM_ERROR".to_string(),
                        message: "Error communicating with upstream service".to_string(),
                        details: Some(failure.to_string()),
                    },
                )
            }
            Self::Config(msg) => {
                error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetails {
                        error_type: "CONFIG_ERROR".to_string(),
                        message: "Internal server configuration error".to_string(),
                        details: None,
                    },
                )
            }
            Self::ConfigValidation { field, message } => {
                error!(config.field = %field, "Configuration validation error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetails {
                        error_type: "CONFIG_ERROR".to_string(),
                        message: "Internal server configuration error".to_string(),
                        details: None,
                    },
                )
            }
            Self::ConfigParse { message, .. } => {
                error!("Configuration parse error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetails {
                        error_type: "CONFIG_PARSE_ERROR".to_string(),
                        message: "Failed to parse configuration file".to_string(),
                        details: None,
                    },
                )
            }
            Self::Io(e) => {
                error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetails {
                        error_type: "IO_ERROR".to_string(),
                        message: "Internal server error during IO operation".to_string(),
                        details: None,
                    },
                )
            }
            Self::HttpClientBuild(e) => {
                error!("HTTP client build error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetails {
                        error_type: "HTTP_CLIENT_BUILD_ERROR".to_string(),
                        message: "Internal server error building HTTP client".to_string(),
                        details: None,
                    },
                )
            }

            // --- 4xx ---
            Self::Json(e) => (
                StatusCode::BAD_REQUEST,
                ErrorDetails {
                    error_type: "JSON_PROCESSING_ERROR".to_string(),
                    message: "Failed to process JSON payload".to_string(),
                    details: Some(e.to_string()),
                },
            ),
            Self::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetails {
                    error_type: "INVALID_REQUEST".to_string(),
                    message: "Invalid request".to_string(),
                    details: Some(msg.clone()),
                },
            ),
            Self::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetails {
                    error_type: "NOT_FOUND".to_string(),
                    message: format!("Resource not found: {resource}"),
                    details: None,
                },
            ),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorDetails {
                    error_type: "UNAUTHORIZED".to_string(),
                    message: "Authentication token is missing or invalid".to_string(),
                    details: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_details) = self.to_status_and_details();
        let body = Json(ErrorResponse {
            error: error_details,
        });
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;
    use std::io;

    async fn check_response(
        error: AppError,
        expected_status: StatusCode,
        expected_type: &str,
        expected_message_substring: &str,
        expect_details: bool,
    ) {
        let response = error.into_response();
        assert_eq!(response.status(), expected_status, "Status code mismatch");

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let body_json: Value =
            serde_json::from_slice(&bytes).expect("Response body is not valid JSON");

        let error_obj = &body_json["error"];
        assert!(!error_obj.is_null(), "JSON 'error' field is missing");
        assert_eq!(error_obj["type"].as_str(), Some(expected_type));

        let error_msg = error_obj["message"].as_str().unwrap_or_default();
        assert!(
            error_msg.contains(expected_message_substring),
            "Expected message '{error_msg}' to contain '{expected_message_substring}'"
        );
        assert_eq!(error_obj["details"].is_string(), expect_details);
    }

    #[tokio::test]
    async fn test_into_response_no_credentials() {
        check_response(
            AppError::NoCredentials,
            StatusCode::SERVICE_UNAVAILABLE,
            "NO_CREDENTIALS",
            "No API credentials",
            false,
        )
        .await;
    }

    #[tokio::test]
    async fn test_into_response_retries_exhausted() {
        check_response(
            AppError::RetriesExhausted {
                attempts: 3,
                last: UpstreamFailure::http(StatusCode::TOO_MANY_REQUESTS, "quota exceeded"),
            },
            StatusCode::SERVICE_UNAVAILABLE,
            "RETRIES_EXHAUSTED",
            "Service overloaded",
            true,
        )
        .await;
    }

    #[tokio::test]
    async fn test_into_response_transport() {
        check_response(
            AppError::Transport(UpstreamFailure::http(
                StatusCode::INTERNAL_SERVER_ERROR,
                "boom",
            )),
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_ERROR",
            "upstream service",
            true,
        )
        .await;
    }

    #[tokio::test]
    async fn test_into_response_config() {
        check_response(
            AppError::Config("Test config issue".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
            "CONFIG_ERROR",
            "Internal server configuration error",
            false,
        )
        .await;
    }

    #[tokio::test]
    async fn test_into_response_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        check_response(
            AppError::Io(io_error),
            StatusCode::INTERNAL_SERVER_ERROR,
            "IO_ERROR",
            "IO operation",
            false,
        )
        .await;
    }

    #[tokio::test]
    async fn test_into_response_unauthorized() {
        check_response(
            AppError::Unauthorized,
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "missing or invalid",
            false,
        )
        .await;
    }

    #[test]
    fn test_retries_exhausted_display_mentions_attempts() {
        let err = AppError::RetriesExhausted {
            attempts: 3,
            last: UpstreamFailure::http(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"),
        };
        assert!(err.is_quota_exhausted());
        assert_eq!(
            err.to_string(),
            "Retries exhausted after 3 attempt(s): HTTP 429: Too Many Requests"
        );
    }
}
