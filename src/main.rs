use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use pathlight::{
    AppState,
    config::Config,
    guard::{Guardrail, SystemClock},
    upstream::UpstreamClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    let guard = Arc::new(Guardrail::from_config(&config, Arc::new(SystemClock)));
    let upstream = UpstreamClient::from_config(&config).expect("Failed to build upstream client");

    tracing::info!(
        max_requests = config.rate_limit_requests,
        window_secs = config.rate_limit_window_secs,
        daily_budget = config.daily_budget,
        upstream = %config.upstream_base_url,
        "Guardrail policy loaded"
    );

    // the rate window never forgets a client on its own
    let sweeper = guard.clone();
    let sweep_every = config.rate_limit_sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        loop {
            ticker.tick().await;
            let removed = sweeper.sweep_idle_clients();
            if removed > 0 {
                tracing::debug!(
                    removed,
                    tracked = sweeper.tracked_clients(),
                    "Swept idle rate-limit clients"
                );
            }
        }
    });

    let state = AppState {
        config: config.clone(),
        guard,
        upstream,
    };
    let app = pathlight::app(state);

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
