use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;

use webmeter_core::error::Result;
use webmeter_core::MetricsRegistry;

use super::AUTH_SCHEME;
use crate::pipeline::{Middleware, Next, RequestContext};

/// Counts requests per resolved authentication scheme (`none` when unauthenticated).
///
/// Authentication runs further down the chain, so the scheme is only known post-downstream.
pub struct AuthSchemeTracker {
    registry: Arc<dyn MetricsRegistry>,
}

impl AuthSchemeTracker {
    pub fn new(registry: Arc<dyn MetricsRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Middleware for AuthSchemeTracker {
    fn name(&self) -> &'static str {
        "auth_scheme"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if !ctx.is_tracked() {
            return next.run(ctx, req).await;
        }
        let res = next.run(ctx, req).await;
        let scheme = ctx.auth_scheme.as_deref().unwrap_or("none");
        self.registry.increment_counter(AUTH_SCHEME, &[("scheme", scheme)], 1);
        res
    }
}
