use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client key for rate limiting. Not a verified identity: the
/// headers it reads are set by whoever sits in front of us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Picks the first of `x-forwarded-for` (first hop), `x-real-ip` and the
/// peer address that is present, falling back to [`UNKNOWN_CLIENT`].
pub fn resolve_client_id(headers: &HeaderMap, remote: Option<SocketAddr>) -> ClientId {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let ip = header("x-forwarded-for")
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| header("x-real-ip").map(str::to_string))
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    ClientId(ip)
}

/// Resolves the [`ClientId`] once and stores it in the request extensions.
pub async fn client_identity(mut req: Request<Body>, next: Next) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let client = resolve_client_id(req.headers(), remote);
    tracing::debug!(client = client.as_str(), "Resolved client identity");
    req.extensions_mut().insert(client);
    next.run(req).await
}
