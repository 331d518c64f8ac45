//! webmeter demo host
//!
//! - Small item API instrumented by the composed chain
//! - Exposition endpoints from config (ping, metrics, env, optional health)
//! - Reporters scheduled after the listener is up, stopped on Ctrl-C

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Request};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use tracing_subscriber::{fmt, EnvFilter};

use webmeter_core::error::{Result, WebMeterError};
use webmeter_http::ops::{HealthRegistry, HealthStatus};
use webmeter_http::{compose, config, router, AuthScheme, HostLifecycle, Services};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, kind = e.kind().as_str(), "webmeter demo failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("WEBMETER_CONFIG").unwrap_or_else(|_| "webmeter.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .listen
        .parse()
        .map_err(|e| WebMeterError::Config(format!("listen must be a valid SocketAddr: {e}")))?;

    let health = Arc::new(HealthRegistry::new());
    health.register_fn("process", || HealthStatus::Healthy);

    let services = Services::from_config(&cfg)?.with_health(health);
    let chain = compose(&services)?;

    let lifecycle = HostLifecycle::new();
    let scheduler = services
        .scheduler(lifecycle.clone(), cfg.reporting.shutdown_grace())?
        .spawn();

    let app = Router::new()
        .route("/items", post(create_item))
        .route("/items/:id", get(get_item))
        .layer(middleware::from_fn(resolve_auth));
    let app = router::instrument(app, chain);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| WebMeterError::Config(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, "webmeter demo listening");
    lifecycle.notify_started();

    let signals = lifecycle.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "ctrl-c handler failed; shutting down");
            }
            signals.notify_stopping();
        })
        .await
        .map_err(|e| WebMeterError::Internal(format!("server failed: {e}")))?;

    lifecycle.notify_stopping();
    scheduler.join().await;
    Ok(())
}

/// Report the `Authorization` scheme (lowercased) to the chain.
async fn resolve_auth(req: Request, next: Next) -> Response {
    let scheme = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_whitespace().next())
        .map(str::to_ascii_lowercase);

    let mut res = next.run(req).await;
    if let Some(s) = scheme {
        res.extensions_mut().insert(AuthScheme(s));
    }
    res
}

async fn create_item(body: Bytes) -> impl IntoResponse {
    (StatusCode::CREATED, format!("stored {} bytes", body.len()))
}

async fn get_item(Path(id): Path<u64>) -> Response {
    if id == 0 {
        return (StatusCode::NOT_FOUND, "no such item").into_response();
    }
    format!("item {id}").into_response()
}
