mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    routing::any,
};
use chrono::TimeDelta;
use pathlight::{
    AppState,
    guard::{Guardrail, ManualClock, SUPPORTED_MODEL, Usage},
    middleware::{ErrorLogged, client_identity},
    routes::claude,
    upstream::UpstreamClient,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{Reply, config_for, proxy, spawn_upstream};

fn post(client: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/claude")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn hello() -> Value {
    json!({ "messages": [{ "role": "user", "content": "hello" }] })
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn forwards_a_sanitized_envelope_and_returns_the_reply() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    let (status, body) = call(
        &proxy.router,
        post(
            "203.0.113.7",
            json!({
                "model": SUPPORTED_MODEL,
                "max_tokens": 500,
                "system": "be brief",
                "messages": [
                    { "role": "user", "content": "hello" },
                    { "role": "assistant", "content": "hi" },
                    { "role": "user", "content": "help me" }
                ],
                "temperature": 2.0
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "msg_test");
    assert_eq!(body["usage"]["input_tokens"], 1200);

    let seen = upstream.last();
    assert_eq!(seen.headers["x-api-key"], "sk-test-secret");
    assert_eq!(seen.headers["anthropic-version"], "2023-06-01");
    assert_eq!(
        seen.body,
        json!({
            "model": SUPPORTED_MODEL,
            "max_tokens": 500,
            "system": "be brief",
            "messages": [
                { "role": "user", "content": "hello" },
                { "role": "assistant", "content": "hi" },
                { "role": "user", "content": "help me" }
            ]
        })
    );

    let spend = proxy.guard.spend();
    assert!((spend.total - 0.00885).abs() < 1e-12);
}

#[tokio::test]
async fn missing_model_and_tokens_get_the_defaults() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    let (status, _) = call(&proxy.router, post("a", hello())).await;
    assert_eq!(status, StatusCode::OK);

    let seen = upstream.last().body;
    assert_eq!(seen["model"], SUPPORTED_MODEL);
    assert_eq!(seen["max_tokens"], 4000);
    assert!(seen.get("system").is_none());
}

#[tokio::test]
async fn twenty_first_request_in_the_hour_is_rate_limited() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    for i in 0..20 {
        let (status, _) = call(&proxy.router, post("198.51.100.1", hello())).await;
        assert_eq!(status, StatusCode::OK, "request {}", i + 1);
        proxy.clock.advance(TimeDelta::seconds(30));
    }

    let (status, body) = call(&proxy.router, post("198.51.100.1", hello())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body,
        json!({
            "error": "Rate limit exceeded. Try again in an hour.",
            "resetIn": "50 minutes"
        })
    );
    assert_eq!(upstream.calls(), 20);

    // another client is unaffected
    let (status, _) = call(&proxy.router, post("198.51.100.2", hello())).await;
    assert_eq!(status, StatusCode::OK);

    // once the first request leaves the window the client is back
    proxy.clock.advance(TimeDelta::minutes(50));
    let (status, _) = call(&proxy.router, post("198.51.100.1", hello())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rejected_requests_still_count_toward_the_quota() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(
        &upstream.base_url,
        &[("RATE_LIMIT_REQUESTS", "2")],
    ));

    let bad = json!({ "model": "gpt-4", "messages": [] });
    let (status, _) = call(&proxy.router, post("a", bad.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&proxy.router, post("a", bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&proxy.router, post("a", hello())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn validation_failures_map_to_their_messages() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    let too_many: Vec<Value> = (0..51)
        .map(|_| json!({ "role": "user", "content": "x" }))
        .collect();
    let cases = [
        (json!({ "model": "gpt-4", "messages": [] }), "Invalid model specified"),
        (
            json!({ "max_tokens": 9000, "messages": [] }),
            "Token limit exceeded. Max 4000 tokens.",
        ),
        (
            json!({ "max_tokens": "9000", "messages": [{ "role": "user", "content": "hi" }] }),
            "Token limit exceeded. Max 4000 tokens.",
        ),
        (json!({ "messages": "hello" }), "Invalid messages format"),
        (json!({}), "Invalid messages format"),
        (
            json!({ "messages": too_many }),
            "Too many messages. Max 50 per request.",
        ),
        (
            json!({ "messages": [{ "role": "user" }] }),
            "Invalid message structure",
        ),
        (
            json!({ "messages": [{ "role": "system", "content": "x" }] }),
            "Invalid message role",
        ),
    ];

    for (i, (body, expected)) in cases.into_iter().enumerate() {
        let (status, reply) = call(&proxy.router, post(&format!("client-{i}"), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{expected}");
        assert_eq!(reply, json!({ "error": expected }));
    }
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn body_that_is_not_json_is_a_messages_format_error() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    let request = Request::builder()
        .method("POST")
        .uri("/api/claude")
        .body(Body::from("messages=hello"))
        .unwrap();
    let (status, body) = call(&proxy.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid messages format");
}

#[tokio::test]
async fn daily_budget_pauses_every_client_until_tomorrow() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    // 2.95 already spent today
    proxy.guard.record_spend(Usage {
        input_tokens: 0,
        output_tokens: 196_667,
    });
    upstream.reply_with(Reply::Text {
        input_tokens: 33_334,
        output_tokens: 0,
    });

    let (status, _) = call(&proxy.router, post("a", hello())).await;
    assert_eq!(status, StatusCode::OK);
    assert!((proxy.guard.spend().total - 3.050007).abs() < 1e-6);

    let (status, body) = call(&proxy.router, post("b", hello())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({
            "error": "Daily API budget reached. Service temporarily paused for cost control.",
            "message": "This helps keep Pathlight free during beta. Try again tomorrow!"
        })
    );
    assert_eq!(upstream.calls(), 1);

    proxy.clock.advance(TimeDelta::days(1));
    let (status, _) = call(&proxy.router, post("b", hello())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(proxy.guard.spend().total < 0.2);
}

#[tokio::test]
async fn upstream_errors_pass_their_status_through() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    upstream.reply_with(Reply::Json(
        529,
        json!({ "type": "error", "error": { "type": "overloaded_error", "message": "Overloaded" } }),
    ));
    let (status, body) = call(&proxy.router, post("a", hello())).await;
    assert_eq!(status.as_u16(), 529);
    assert_eq!(
        body,
        json!({ "error": "AI service error", "message": "Overloaded" })
    );

    upstream.reply_with(Reply::Json(400, json!({ "oops": true })));
    let (status, body) = call(&proxy.router, post("a", hello())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Something went wrong");

    assert_eq!(proxy.guard.spend().total, 0.0);
}

#[tokio::test]
async fn long_upstream_error_messages_keep_their_envelope() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));
    let long = "x".repeat(5000);

    upstream.reply_with(Reply::Json(503, json!({ "error": { "message": long } })));
    let response = proxy.router.clone().oneshot(post("a", hello())).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.extensions().get::<ErrorLogged>().is_none());

    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "error": "AI service error", "message": long }));
}

#[tokio::test]
async fn transport_failures_become_a_generic_server_error() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    upstream.reply_with(Reply::Garbage);
    let (status, body) = call(&proxy.router, post("a", hello())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Server error", "message": "Unable to process request. Please try again." })
    );

    // nothing listens on port 9 of localhost
    let proxy = common::proxy(config_for("http://127.0.0.1:9", &[]));
    let response = proxy.router.clone().oneshot(post("a", hello())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.extensions().get::<ErrorLogged>().is_some());
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Server error");
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(
        &upstream.base_url,
        &[("UPSTREAM_TIMEOUT_SECS", "1")],
    ));
    upstream.reply_with(Reply::Slow(Duration::from_secs(5)));

    let (status, body) = call(&proxy.router, post("a", hello())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server error");
}

#[tokio::test]
async fn only_post_reaches_the_pipeline() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    let get = Request::builder()
        .method("GET")
        .uri("/api/claude")
        .header("x-forwarded-for", "a")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&proxy.router, get).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "error": "Method not allowed" }));
    assert_eq!(proxy.guard.requests_in_window("a"), 0);

    let options = Request::builder()
        .method("OPTIONS")
        .uri("/api/claude")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&proxy.router, options).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn handler_answers_options_without_the_cors_layer() {
    let upstream = spawn_upstream().await;
    let config = config_for(&upstream.base_url, &[]);
    let clock = Arc::new(ManualClock::new(common::noon()));
    let guard = Arc::new(Guardrail::from_config(&config, clock));
    let state = AppState {
        upstream: UpstreamClient::from_config(&config).unwrap(),
        config,
        guard,
    };
    let bare = Router::new()
        .route("/claude", any(claude::generate))
        .layer(axum::middleware::from_fn(client_identity))
        .with_state(state);

    let options = Request::builder()
        .method("OPTIONS")
        .uri("/claude")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&bare, options).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/claude")
        .header(header::ORIGIN, "https://pathlight.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = proxy.router.clone().oneshot(preflight).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );

    let mut request = post("a", hello());
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://pathlight.example".parse().unwrap());
    let response = proxy.router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn requests_without_any_address_share_the_unknown_bucket() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    let request = Request::builder()
        .method("POST")
        .uri("/api/claude")
        .body(Body::from(hello().to_string()))
        .unwrap();
    let (status, _) = call(&proxy.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proxy.guard.requests_in_window("unknown"), 1);
}

#[tokio::test]
async fn health_check_is_outside_the_api_prefix() {
    let upstream = spawn_upstream().await;
    let proxy = proxy(config_for(&upstream.base_url, &[]));

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&proxy.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
