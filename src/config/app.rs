// src/config/app.rs

use crate::handlers::rate_limit::DEFAULT_QUOTA_PATTERNS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token guarding the `/admin` routes. Without one they reject every request.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            admin_token: None,
        }
    }
}

/// How the credential is attached to an upstream request.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyPlacement {
    /// `x-goog-api-key` header.
    #[default]
    Header,
    /// `key` query parameter.
    Query,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub key_placement: KeyPlacement,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            key_placement: KeyPlacement::default(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Serialize)]
pub struct RotationConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_quota_patterns")]
    pub quota_patterns: Vec<String>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            max_attempts: default_max_attempts(),
            cooldown_secs: default_cooldown_secs(),
            quota_patterns: default_quota_patterns(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_api_version() -> String {
    "v1beta".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

fn default_cooldown_secs() -> u64 {
    3600
}

fn default_quota_patterns() -> Vec<String> {
    DEFAULT_QUOTA_PATTERNS.iter().map(|p| p.to_string()).collect()
}
