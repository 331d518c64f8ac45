use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use webmeter_core::error::Result;

use super::TEXT_PLAIN;
use crate::pipeline::{Middleware, Next, RequestContext};

pub struct PingEndpoint {
    path: String,
}

impl PingEndpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Middleware for PingEndpoint {
    fn name(&self) -> &'static str {
        "ping_endpoint"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if ctx.path != self.path {
            return next.run(ctx, req).await;
        }
        Ok((StatusCode::OK, [(header::CONTENT_TYPE, TEXT_PLAIN)], "pong").into_response())
    }
}
