use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::state::ChatMessage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to the proxy failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("proxy refused the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("proxy reply has no text content")]
    Malformed,
}

/// Produces the automated reply for a prepared request.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ClientError>;
}

/// Talks to the guardrail proxy over HTTP.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ProxyClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl GenerationBackend for ProxyClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ClientError> {
        let response = self.http.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        reply_text(&body).ok_or(ClientError::Malformed)
    }
}

/// Text of the first content block of a provider reply.
pub fn reply_text(body: &Value) -> Option<String> {
    body.get("content")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}
