#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use webmeter_core::MetricsRegistry;
use webmeter_http::config;
use webmeter_http::ops::{HealthRegistry, HealthStatus};
use webmeter_http::pipeline::units::{AUTH_SCHEME, ERROR_REQUESTS, REQUESTS, REQUEST_DURATION};
use webmeter_http::{compose, router, AuthScheme, Services};

const CONFIG: &str = r#"
version: 1
metrics:
  context_label: "shop"
  global_tags: { env: "test" }
endpoints:
  health_enabled: true
"#;

struct Harness {
    app: Router,
    registry: Arc<dyn MetricsRegistry>,
}

fn harness(health: HealthRegistry) -> Harness {
    let cfg = config::load_from_str(CONFIG).unwrap();
    let services = Services::from_config(&cfg).unwrap().with_health(Arc::new(health));
    let chain = compose(&services).unwrap();

    let app = Router::new()
        .route("/items/:id", get(|| async { "item" }))
        .route("/secure", get(|| async { "secret" }))
        .layer(middleware::from_fn(bearer_stub));
    Harness { app: router::instrument(app, chain), registry: services.registry().unwrap() }
}

async fn bearer_stub(req: Request, next: Next) -> Response {
    let authed = req.headers().contains_key(header::AUTHORIZATION);
    let mut res = next.run(req).await;
    if authed {
        res.extensions_mut().insert(AuthScheme("bearer".into()));
    }
    res
}

async fn call(app: &Router, req: Request) -> (StatusCode, Option<String>, String) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let ctype = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, ctype, String::from_utf8(body.to_vec()).unwrap())
}

fn get_req(uri: &str) -> Request {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn ping_short_circuits_without_tracking() {
    let h = harness(HealthRegistry::new());
    let (status, _, body) = call(&h.app, get_req("/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "pong");
    assert_eq!(h.registry.snapshot().meter(REQUESTS, &[]), None);
}

#[tokio::test]
async fn timer_uses_matched_route_template() {
    let h = harness(HealthRegistry::new());
    let (status, _, _) = call(&h.app, get_req("/items/42")).await;
    assert_eq!(status, StatusCode::OK);

    let snap = h.registry.snapshot();
    let timer = snap
        .timer(REQUEST_DURATION, &[("method", "GET"), ("route", "/items/:id")])
        .expect("timed under template");
    assert_eq!(timer.count, 1);
    assert_eq!(snap.meter(REQUESTS, &[]).map(|m| m.count), Some(1));
}

#[tokio::test]
async fn auth_scheme_is_read_after_the_handler() {
    let h = harness(HealthRegistry::new());
    let req = Request::builder()
        .uri("/secure")
        .header(header::AUTHORIZATION, "Bearer abc")
        .body(Body::empty())
        .unwrap();
    call(&h.app, req).await;
    call(&h.app, get_req("/secure")).await;

    let snap = h.registry.snapshot();
    assert_eq!(snap.counter(AUTH_SCHEME, &[("scheme", "bearer")]), Some(1));
    assert_eq!(snap.counter(AUTH_SCHEME, &[("scheme", "none")]), Some(1));
}

#[tokio::test]
async fn unknown_route_counts_as_error_under_raw_path() {
    let h = harness(HealthRegistry::new());
    let (status, _, _) = call(&h.app, get_req("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let snap = h.registry.snapshot();
    let errors = snap
        .meter(ERROR_REQUESTS, &[("route", "/nope"), ("status", "404")])
        .expect("404 metered");
    assert_eq!(errors.count, 1);
}

#[tokio::test]
async fn text_exposition_reflects_prior_requests() {
    let h = harness(HealthRegistry::new());
    call(&h.app, get_req("/items/1")).await;

    let (status, ctype, body) = call(&h.app, get_req("/metrics-text")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctype.unwrap().starts_with("text/plain; version=0.0.4"));
    assert!(body.contains("# TYPE http_requests counter"));
    assert!(body.contains("env=\"test\""));
}

#[tokio::test]
async fn structured_snapshot_is_json() {
    let h = harness(HealthRegistry::new());
    let (status, ctype, body) = call(&h.app, get_req("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctype.as_deref(), Some("application/json"));

    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["context"], "shop");
    assert_eq!(v["global_tags"]["env"], "test");
}

#[tokio::test]
async fn health_reports_503_when_a_check_is_unhealthy() {
    let health = HealthRegistry::new();
    health.register_fn("db", || HealthStatus::Healthy);
    health.register_fn("queue", || HealthStatus::Unhealthy("backlog".into()));
    let h = harness(health);

    let (status, _, body) = call(&h.app, get_req("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["status"], "unhealthy");
    assert_eq!(v["checks"]["queue"]["message"], "backlog");
}

#[tokio::test]
async fn env_info_reports_crate_version() {
    let h = harness(HealthRegistry::new());
    let (status, _, body) = call(&h.app, get_req("/env")).await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(v["os"], std::env::consts::OS);
}
