#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{Local, TimeZone};
use pathlight::{
    AppState,
    config::Config,
    guard::{Guardrail, ManualClock},
    upstream::UpstreamClient,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const REPORT: &str = "# Your Pathways Forward

## Your Profile

You come alive when you are fixing things for people.

## Next Three Steps

1. **This week:** Visit a local repair cafe.
";

/// How the fake provider answers the next calls.
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with a text block and the given usage.
    Text { input_tokens: u64, output_tokens: u64 },
    /// Any status with a raw JSON body.
    Json(u16, Value),
    /// 200 with a body that is not JSON.
    Garbage,
    /// Sleeps before answering.
    Slow(Duration),
}

#[derive(Debug, Clone)]
pub struct Seen {
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone)]
pub struct MockUpstream {
    pub base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
    reply: Arc<Mutex<Reply>>,
}

impl MockUpstream {
    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Seen {
        self.seen().last().cloned().expect("upstream was never called")
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn reply_with(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }
}

async fn messages(
    State(mock): State<MockUpstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.seen.lock().unwrap().push(Seen {
        headers,
        body: body.clone(),
    });
    let reply = mock.reply.lock().unwrap().clone();

    match reply {
        Reply::Text {
            input_tokens,
            output_tokens,
        } => {
            let system = body["system"].as_str().unwrap_or_default();
            let text = if system.contains("career clarity report") {
                REPORT.to_string()
            } else {
                "Give me an example. The more specific, the better.".to_string()
            };
            Json(json!({
                "id": "msg_test",
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "text", "text": text }],
                "usage": { "input_tokens": input_tokens, "output_tokens": output_tokens }
            }))
            .into_response()
        }
        Reply::Json(status, body) => (
            StatusCode::from_u16(status).unwrap(),
            Json(body),
        )
            .into_response(),
        Reply::Garbage => (StatusCode::OK, "<html>bad gateway</html>").into_response(),
        Reply::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({ "content": [{ "type": "text", "text": "late" }] })).into_response()
        }
    }
}

pub async fn spawn_upstream() -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mock = MockUpstream {
        base_url: format!("http://{}", addr),
        seen: Arc::default(),
        reply: Arc::new(Mutex::new(Reply::Text {
            input_tokens: 1200,
            output_tokens: 350,
        })),
    };
    let app = Router::new()
        .route("/v1/messages", post(messages))
        .with_state(mock.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    mock
}

pub fn config_for(upstream_base_url: &str, extra: &[(&str, &str)]) -> Config {
    let mut pairs: Vec<(String, String)> = vec![
        ("ANTHROPIC_API_KEY".into(), "sk-test-secret".into()),
        ("UPSTREAM_BASE_URL".into(), upstream_base_url.into()),
    ];
    pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Config::from_lookup(|key| {
        pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap()
}

pub fn noon() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub struct TestProxy {
    pub router: Router,
    pub guard: Arc<Guardrail>,
    pub clock: Arc<ManualClock>,
}

pub fn proxy(config: Config) -> TestProxy {
    let clock = Arc::new(ManualClock::new(noon()));
    let guard = Arc::new(Guardrail::from_config(&config, clock.clone()));
    let upstream = UpstreamClient::from_config(&config).unwrap();
    let router = pathlight::app(AppState {
        config,
        guard: guard.clone(),
        upstream,
    });
    TestProxy {
        router,
        guard,
        clock,
    }
}

/// Serves the proxy on a real socket and returns its generation endpoint.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{}/api/claude", addr)
}
