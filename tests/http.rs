//! HTTP surface tests driving the assembled router with tower's oneshot.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use vakt::audit::AuditSink;
use vakt::config::{Config, ProviderConfig, RouteConfig};
use vakt::gateway::Gateway;
use vakt::providers::build_registry;
use vakt::{build_app, AppState};

fn test_config() -> Config {
    let mut config = Config::default();
    config.config_version = "cafebabe0000".to_string();
    config.rate_limit.enabled = false;
    config.providers.insert(
        "primary".to_string(),
        ProviderConfig {
            kind: "mock".to_string(),
            model: "mock-small".to_string(),
            base_url: None,
            api_key_env: None,
            timeout_secs: 5,
        },
    );
    config.routes.insert(
        "default".to_string(),
        RouteConfig {
            providers: vec!["primary".to_string()],
        },
    );
    config
}

fn test_app(config: Config) -> axum::Router {
    let config = Arc::new(config);
    let registry = build_registry(&config.providers).unwrap();
    let (audit, _rx) = AuditSink::new();
    let gateway = Arc::new(Gateway::new(Arc::clone(&config), registry, audit).unwrap());
    build_app(AppState { config, gateway })
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_reports_config_version() {
    let app = test_app(test_config());
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["config_version"], "cafebabe0000");
}

#[tokio::test]
async fn chat_completion_end_to_end() {
    let app = test_app(test_config());
    let request = Request::post("/v1/chat/completions")
        .header("content-type", "application/json")
        .header("x-tenant-id", "acme")
        .header("x-request-id", "rid-1")
        .body(Body::from(
            r#"{"messages": [{"role": "user", "content": "hello"}]}"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["provider"], "primary");
    assert_eq!(body["model"], "mock-small");
    assert_eq!(body["request_id"], "rid-1");
    assert_eq!(body["fallback_used"], false);
    assert!(body["content"].as_str().unwrap().contains("[mock]"));
    assert!(body["usage"]["total_tokens"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn unknown_route_maps_to_400() {
    let app = test_app(test_config());
    let request = Request::post("/v1/chat/completions")
        .header("content-type", "application/json")
        .header("x-route", "nonexistent")
        .body(Body::from(
            r#"{"messages": [{"role": "user", "content": "hello"}]}"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn rate_limit_denial_maps_to_429_with_code() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.capacity = 1;
    config.rate_limit.refill_per_sec = 0.0;
    let app = test_app(config);

    let make_request = || {
        Request::post("/v1/chat/completions")
            .header("content-type", "application/json")
            .header("x-tenant-id", "acme")
            .body(Body::from(
                r#"{"messages": [{"role": "user", "content": "hello"}]}"#,
            ))
            .unwrap()
    };

    let first = app.clone().oneshot(make_request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(make_request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(second).await;
    assert_eq!(body["error"]["code"], "policy_denied");
    assert!(body["error"]["request_id"].is_string());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = test_config();
    config.server.request_body_max_bytes = 64;
    let app = test_app(config);

    let huge = format!(
        r#"{{"messages": [{{"role": "user", "content": "{}"}}]}}"#,
        "x".repeat(1024)
    );
    let request = Request::post("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(huge))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
