use axum::body::Bytes;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::Config;
use crate::error::{ProxyError, UPSTREAM_FALLBACK_MESSAGE};
use crate::guard::SanitizedEnvelope;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "/v1/messages";

/// A successful provider reply: the raw bytes to hand back unchanged, and
/// their parsed form for usage accounting.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub raw: Bytes,
    pub body: Value,
}

/// Client for the provider's messages endpoint. Holds the API key so it
/// never leaves the server.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl UpstreamClient {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}{}", config.upstream_base_url, MESSAGES_PATH),
            api_key: config.anthropic_api_key.clone(),
        })
    }

    /// Sends the envelope and returns the provider's reply on success.
    ///
    /// A non-success status becomes [`ProxyError::Upstream`] with the same
    /// status; transport faults, timeouts and unreadable bodies become
    /// [`ProxyError::Internal`].
    pub async fn send(&self, envelope: &SanitizedEnvelope) -> Result<UpstreamReply, ProxyError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(envelope)
            .send()
            .await
            .map_err(|e| ProxyError::Internal(format!("upstream request failed: {}", e)))?;

        let status = response.status();
        let raw = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Internal(format!("upstream body unreadable: {}", e)))?;
        let body: Value = serde_json::from_slice(&raw)
            .map_err(|e| ProxyError::Internal(format!("upstream body is not JSON: {}", e)))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or(UPSTREAM_FALLBACK_MESSAGE)
                .to_string();
            return Err(ProxyError::Upstream { status, message });
        }

        Ok(UpstreamReply { raw, body })
    }
}
