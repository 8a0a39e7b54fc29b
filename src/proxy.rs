// src/proxy.rs

use crate::{
    config::{KeyPlacement, UpstreamConfig},
    error::{AppError, Result},
    handlers::base::UpstreamFailure,
};
use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";
const API_KEY_QUERY_PARAM: &str = "key";

/// One logical request: the target model plus an opaque JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub model: String,
    pub payload: Value,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, payload: Value) -> Self {
        Self {
            model: model.into(),
            payload,
        }
    }

    /// The model identifier as it goes into the upstream path, with any
    /// leading `models/` dropped.
    ///
    /// Empty names and names containing `/` or `:` are rejected as a bad
    /// request. The check is local, so it happens before any key is used.
    pub fn model_id(&self) -> Result<&str> {
        let model = self.model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model);
        if model.is_empty() || model.contains('/') || model.contains(':') {
            return Err(AppError::InvalidRequest(format!(
                "invalid model identifier '{}'",
                self.model
            )));
        }
        Ok(model)
    }

    /// Single-turn text prompt in the `generateContent` shape.
    pub fn from_prompt(model: impl Into<String>, prompt: &str) -> Self {
        Self::new(
            model,
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
            }),
        )
    }
}

/// A successful (2xx) upstream response with a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl UpstreamResponse {
    /// Concatenated text parts of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let parts = self
            .body
            .pointer("/candidates/0/content/parts")?
            .as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Sends one attempt of a request with a given credential.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &ModelRequest,
        api_key: &SecretString,
    ) -> std::result::Result<UpstreamResponse, UpstreamFailure>;
}

/// `generateContent` over HTTPS with reqwest.
#[derive(Debug, Clone)]
pub struct GeminiTransport {
    client: Client,
    base_url: String,
    api_version: String,
    key_placement: KeyPlacement,
}

impl GeminiTransport {
    pub fn new(upstream: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(upstream.connect_timeout_secs))
            .timeout(Duration::from_secs(upstream.request_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .build()
            .map_err(AppError::HttpClientBuild)?;
        Ok(Self::with_client(client, upstream))
    }

    pub fn with_client(client: Client, upstream: &UpstreamConfig) -> Self {
        Self {
            client,
            base_url: upstream.base_url.trim_end_matches('/').to_string(),
            api_version: upstream.api_version.trim_matches('/').to_string(),
            key_placement: upstream.key_placement,
        }
    }

    /// `{base}/{version}/models/{model}:generateContent` for an already
    /// validated model id.
    pub fn endpoint(&self, model: &str) -> std::result::Result<Url, UpstreamFailure> {
        let raw = format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, self.api_version, model
        );
        Url::parse(&raw)
            .map_err(|e| UpstreamFailure::network(format!("failed to build upstream URL: {e}")))
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn send(
        &self,
        request: &ModelRequest,
        api_key: &SecretString,
    ) -> std::result::Result<UpstreamResponse, UpstreamFailure> {
        let model = request
            .model_id()
            .map_err(|e| UpstreamFailure::network(e.to_string()))?;
        let url = self.endpoint(model)?;
        trace!(model = %request.model, "Sending generateContent request");

        let mut builder = self.client.post(url).json(&request.payload);
        builder = match self.key_placement {
            KeyPlacement::Header => builder.header(API_KEY_HEADER, api_key.expose_secret()),
            KeyPlacement::Query => {
                builder.query(&[(API_KEY_QUERY_PARAM, api_key.expose_secret())])
            }
        };

        let response = builder.send().await.map_err(UpstreamFailure::from_reqwest)?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(UpstreamFailure::from_reqwest)?;
        debug!(status = status.as_u16(), body_len = bytes.len(), "Upstream responded");

        if !status.is_success() {
            return Err(UpstreamFailure::http(
                status,
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }

        let body = serde_json::from_slice(&bytes).map_err(|e| {
            UpstreamFailure::http(status, format!("malformed response body: {e}"))
        })?;
        Ok(UpstreamResponse { status, body })
    }
}
