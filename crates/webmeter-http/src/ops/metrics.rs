use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use webmeter_core::error::Result;
use webmeter_core::MetricsRegistry;

use super::{json_response, PROMETHEUS_TEXT};
use crate::pipeline::{Middleware, Next, RequestContext};

/// Prometheus text exposition of the current snapshot.
pub struct MetricsTextEndpoint {
    path: String,
    registry: Arc<dyn MetricsRegistry>,
}

impl MetricsTextEndpoint {
    pub fn new(path: impl Into<String>, registry: Arc<dyn MetricsRegistry>) -> Self {
        Self { path: path.into(), registry }
    }
}

#[async_trait]
impl Middleware for MetricsTextEndpoint {
    fn name(&self) -> &'static str {
        "metrics_text_endpoint"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if ctx.path != self.path {
            return next.run(ctx, req).await;
        }
        let body = self.registry.snapshot().render_text();
        Ok((StatusCode::OK, [(header::CONTENT_TYPE, PROMETHEUS_TEXT)], body).into_response())
    }
}

/// Structured (JSON) snapshot.
pub struct MetricsEndpoint {
    path: String,
    registry: Arc<dyn MetricsRegistry>,
}

impl MetricsEndpoint {
    pub fn new(path: impl Into<String>, registry: Arc<dyn MetricsRegistry>) -> Self {
        Self { path: path.into(), registry }
    }
}

#[async_trait]
impl Middleware for MetricsEndpoint {
    fn name(&self) -> &'static str {
        "metrics_endpoint"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if ctx.path != self.path {
            return next.run(ctx, req).await;
        }
        json_response(StatusCode::OK, &self.registry.snapshot())
    }
}
