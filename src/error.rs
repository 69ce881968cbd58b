use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const BUDGET_PAUSED_MESSAGE: &str =
    "This helps keep Pathlight free during beta. Try again tomorrow!";
pub const SERVER_ERROR_MESSAGE: &str = "Unable to process request. Please try again.";
pub const UPSTREAM_FALLBACK_MESSAGE: &str = "Something went wrong";

/// Every way the proxy can turn a request away. The `Display` text of the
/// client-facing variants is exactly the `error` field sent back.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Rate limit exceeded. Try again in an hour.")]
    RateLimited { reset_in_minutes: u64 },
    #[error("Daily API budget reached. Service temporarily paused for cost control.")]
    BudgetExhausted,
    #[error("Invalid model specified")]
    InvalidModel,
    #[error("Token limit exceeded. Max 4000 tokens.")]
    TokenLimitExceeded,
    #[error("Invalid messages format")]
    InvalidMessagesFormat,
    #[error("Too many messages. Max 50 per request.")]
    TooManyMessages,
    #[error("Invalid message structure")]
    InvalidMessageStructure,
    #[error("Invalid message role")]
    InvalidMessageRole,
    #[error("AI service error")]
    Upstream { status: StatusCode, message: String },
    #[error("Server error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(rename = "resetIn", skip_serializing_if = "Option::is_none")]
    reset_in: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::BudgetExhausted => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::InvalidModel
            | ProxyError::TokenLimitExceeded
            | ProxyError::InvalidMessagesFormat
            | ProxyError::TooManyMessages
            | ProxyError::InvalidMessageStructure
            | ProxyError::InvalidMessageRole => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable kind, used in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MethodNotAllowed => "method_not_allowed",
            ProxyError::RateLimited { .. } => "rate_limited",
            ProxyError::BudgetExhausted => "budget_exhausted",
            ProxyError::InvalidModel => "invalid_model",
            ProxyError::TokenLimitExceeded => "token_limit_exceeded",
            ProxyError::InvalidMessagesFormat => "invalid_messages_format",
            ProxyError::TooManyMessages => "too_many_messages",
            ProxyError::InvalidMessageStructure => "invalid_message_structure",
            ProxyError::InvalidMessageRole => "invalid_message_role",
            ProxyError::Upstream { .. } => "upstream_error",
            ProxyError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (reset_in, message) = match &self {
            ProxyError::RateLimited { reset_in_minutes } => {
                (Some(format!("{} minutes", reset_in_minutes)), None)
            }
            ProxyError::BudgetExhausted => (None, Some(BUDGET_PAUSED_MESSAGE.to_string())),
            ProxyError::Upstream { message, .. } => (None, Some(message.clone())),
            // the detail stays in the server log
            ProxyError::Internal(_) => (None, Some(SERVER_ERROR_MESSAGE.to_string())),
            _ => (None, None),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            reset_in,
            message,
        });

        (status, body).into_response()
    }
}
