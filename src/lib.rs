use std::sync::Arc;

use axum::{
    Router,
    http::Method,
    routing::{any, get},
};
use config::Config;
use guard::Guardrail;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use upstream::UpstreamClient;

pub mod config;
pub mod error;
pub mod guard;
pub mod interview;
pub mod middleware;
pub mod routes;
pub mod upstream;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub guard: Arc<Guardrail>,
    pub upstream: UpstreamClient,
}

/// Builds the full router: the guarded generation endpoint under the
/// configured base path, a health check, and the shared middleware stack.
pub fn app(state: AppState) -> Router {
    let api = Router::new().route("/claude", any(routes::claude::generate));

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    router
        .route("/health", get(routes::claude::health))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::log_errors))
                .layer(cors)
                .layer(axum::middleware::from_fn(middleware::client_identity)),
        )
        .with_state(state)
}
