use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;

use webmeter_core::error::Result;
use webmeter_core::MetricsRegistry;

use super::REQUEST_BODY_SIZE;
use crate::pipeline::context::{carries_body, declared_content_length};
use crate::pipeline::{Middleware, Next, RequestContext};

/// Histogram of declared request body sizes for POST/PUT/PATCH, tagged by route.
///
/// Methods without a body record nothing. A missing or malformed `Content-Length` counts as 0.
pub struct BodySizeHistogram {
    registry: Arc<dyn MetricsRegistry>,
}

impl BodySizeHistogram {
    pub fn new(registry: Arc<dyn MetricsRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Middleware for BodySizeHistogram {
    fn name(&self) -> &'static str {
        "body_size"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if !ctx.is_tracked() || !carries_body(&ctx.method) {
            return next.run(ctx, req).await;
        }
        ctx.body_size = Some(declared_content_length(&req));
        let res = next.run(ctx, req).await;
        if let Some(size) = ctx.body_size {
            self.registry
                .observe_histogram(REQUEST_BODY_SIZE, &[("route", ctx.route_or_path())], size);
        }
        res
    }
}
