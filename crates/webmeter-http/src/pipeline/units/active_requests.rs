use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;

use webmeter_core::error::Result;
use webmeter_core::MetricsRegistry;

use super::ACTIVE_REQUESTS;
use crate::pipeline::{Middleware, Next, RequestContext};

/// In-flight request gauge.
///
/// The increment is paired with a decrement in `ActiveGuard::drop`, so the gauge nets to zero
/// whether the downstream returns, fails, panics, or the request future is dropped.
pub struct ActiveRequests {
    registry: Arc<dyn MetricsRegistry>,
}

impl ActiveRequests {
    pub fn new(registry: Arc<dyn MetricsRegistry>) -> Self {
        Self { registry }
    }
}

struct ActiveGuard<'a> {
    registry: &'a dyn MetricsRegistry,
}

impl<'a> ActiveGuard<'a> {
    fn acquire(registry: &'a dyn MetricsRegistry) -> Self {
        registry.add_gauge(ACTIVE_REQUESTS, &[], 1);
        Self { registry }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.registry.add_gauge(ACTIVE_REQUESTS, &[], -1);
    }
}

#[async_trait]
impl Middleware for ActiveRequests {
    fn name(&self) -> &'static str {
        "active_requests"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if !ctx.is_tracked() {
            return next.run(ctx, req).await;
        }
        let _guard = ActiveGuard::acquire(self.registry.as_ref());
        next.run(ctx, req).await
    }
}
