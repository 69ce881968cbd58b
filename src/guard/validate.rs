//! Inbound body validation and the sanitized upstream envelope.
//!
//! Bodies are inspected as loose JSON so that each malformed shape maps to
//! its own rejection instead of a generic deserialization failure.

use serde::Serialize;
use serde_json::Value;

use crate::error::ProxyError;

pub const SUPPORTED_MODEL: &str = "claude-sonnet-4-20250514";
pub const MAX_TOKENS: u32 = 4000;
pub const MAX_MESSAGES: usize = 50;
const ALLOWED_ROLES: [&str; 2] = ["user", "assistant"];

/// The only request shape ever forwarded upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedEnvelope {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Value>,
}

/// Checks the body field by field, stopping at the first problem, and
/// rebuilds it as a [`SanitizedEnvelope`].
pub fn validate(body: &Value) -> Result<SanitizedEnvelope, ProxyError> {
    if let Some(model) = body.get("model").filter(|m| is_truthy(m)) {
        if model.as_str() != Some(SUPPORTED_MODEL) {
            return Err(ProxyError::InvalidModel);
        }
    }

    let requested_tokens = body.get("max_tokens").and_then(numeric);
    if requested_tokens.is_some_and(|t| t > MAX_TOKENS as f64) {
        return Err(ProxyError::TokenLimitExceeded);
    }

    let messages = body
        .get("messages")
        .and_then(Value::as_array)
        .ok_or(ProxyError::InvalidMessagesFormat)?;

    if messages.len() > MAX_MESSAGES {
        return Err(ProxyError::TooManyMessages);
    }

    for message in messages {
        let role = message.get("role").filter(|r| is_truthy(r));
        let content = message.get("content").filter(|c| is_truthy(c));
        let (Some(role), Some(_)) = (role, content) else {
            return Err(ProxyError::InvalidMessageStructure);
        };
        if !role.as_str().is_some_and(|r| ALLOWED_ROLES.contains(&r)) {
            return Err(ProxyError::InvalidMessageRole);
        }
    }

    Ok(SanitizedEnvelope {
        model: SUPPORTED_MODEL.to_string(),
        max_tokens: clamp_max_tokens(requested_tokens),
        messages: messages.clone(),
        system: body.get("system").filter(|s| is_truthy(s)).cloned(),
    })
}

/// A missing, zero or non-positive request means the full allowance.
pub fn clamp_max_tokens(requested: Option<f64>) -> u32 {
    match requested {
        Some(t) if t >= 1.0 => (t.floor() as u32).min(MAX_TOKENS),
        _ => MAX_TOKENS,
    }
}

// numeric strings count as numbers, as they do for the browser client
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
