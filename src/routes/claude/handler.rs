use axum::{
    body::{Body, Bytes},
    extract::{Extension, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::AppState;
use crate::error::ProxyError;
use crate::guard::{Usage, validate};
use crate::middleware::{ClientId, ErrorLogged};
use crate::upstream::UpstreamReply;

/// The guarded path to the provider: method, rate, budget, validation,
/// upstream. Each gate either rejects or passes the request on.
pub async fn generate(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
    method: Method,
    body: Bytes,
) -> Response {
    // inside `app()` the CORS layer answers OPTIONS first; this covers the
    // handler mounted without it
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    match forward(&state, &client, &method, &body).await {
        Ok(reply) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            Body::from(reply.raw),
        )
            .into_response(),
        Err(e) => {
            let mut logged = false;
            match &e {
                // the body hides the detail, so it is logged here instead of by `log_errors`
                ProxyError::Internal(detail) => {
                    tracing::error!(client = client.as_str(), error = %detail, "Server error");
                    logged = true;
                }
                ProxyError::Upstream { status, message } if !status.is_server_error() => {
                    tracing::warn!(
                        client = client.as_str(),
                        status = %status,
                        message = %message,
                        "Anthropic API error"
                    );
                }
                // upstream 5xx bodies are logged by `log_errors`
                ProxyError::Upstream { .. } => {}
                other => {
                    tracing::debug!(client = client.as_str(), kind = other.kind(), "Request rejected");
                }
            }
            let mut response = e.into_response();
            if logged {
                response.extensions_mut().insert(ErrorLogged);
            }
            response
        }
    }
}

async fn forward(
    state: &AppState,
    client: &ClientId,
    method: &Method,
    body: &Bytes,
) -> Result<UpstreamReply, ProxyError> {
    if *method != Method::POST {
        return Err(ProxyError::MethodNotAllowed);
    }

    state.guard.admit(client.as_str())?;

    // an unparseable body is treated like one without messages
    let payload: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let envelope = validate(&payload)?;

    let reply = state.upstream.send(&envelope).await?;

    let usage = Usage::from_response(&reply.body);
    let (cost, daily_total) = state.guard.record_spend(usage);
    tracing::info!(
        client = client.as_str(),
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        cost = %format!("{:.4}", cost),
        daily_total = %format!("{:.2}", daily_total),
        "API call"
    );

    Ok(reply)
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({ "status": "ok" })))
}
