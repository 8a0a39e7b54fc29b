//! Common test utilities and fixtures

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use gemini_key_rotator::{
    config::{AppConfig, UpstreamConfig},
    core::Clock,
    GeminiTransport, KeyRotationClient, RotationSettings,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const MODEL: &str = "gemini-1.5-flash";
pub const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

pub const K1: &str = "AIzaSyTestKeyNumberOne00000001";
pub const K2: &str = "AIzaSyTestKeyNumberTwo00000002";
pub const K3: &str = "AIzaSyTestKeyNumberThree000003";
pub const K4: &str = "AIzaSyTestKeyNumberFour0000004";

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub fn upstream_config(server: &MockServer) -> UpstreamConfig {
    UpstreamConfig {
        base_url: server.uri(),
        ..UpstreamConfig::default()
    }
}

pub fn transport_for(upstream: &UpstreamConfig) -> Arc<GeminiTransport> {
    Arc::new(GeminiTransport::with_client(reqwest::Client::new(), upstream))
}

/// Client with default settings pointed at the mock server.
pub fn client_for(server: &MockServer, keys: &[&str]) -> KeyRotationClient {
    KeyRotationClient::new(
        transport_for(&upstream_config(server)),
        RotationSettings::default(),
    )
    .with_keys(keys.iter().copied())
}

pub fn client_with_clock(
    server: &MockServer,
    keys: &[&str],
    clock: Arc<dyn Clock>,
) -> KeyRotationClient {
    client_for(server, keys).with_clock(clock)
}

/// Config with the given keys, pointed at the mock server.
pub fn app_config_for(server: &MockServer, keys: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.upstream = upstream_config(server);
    config.rotation.api_keys = keys.iter().map(|k| k.to_string()).collect();
    config
}

pub fn success_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

pub fn quota_body() -> Value {
    json!({
        "error": {
            "code": 429,
            "message": "Resource has been exhausted (e.g. check quota).",
            "status": "RESOURCE_EXHAUSTED"
        }
    })
}

pub fn quota_response() -> ResponseTemplate {
    ResponseTemplate::new(429).set_body_json(quota_body())
}

pub fn success_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(success_body(text))
}

/// Mounts a response for requests carrying `key`, expecting exactly `calls` hits.
pub async fn mount_for_key(
    server: &MockServer,
    key: &str,
    response: ResponseTemplate,
    calls: u64,
) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", key))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

/// Mounts a response for any key, expecting exactly `calls` hits.
pub async fn mount_any_key(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}
