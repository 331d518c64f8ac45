use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;

use webmeter_core::error::Result;
use webmeter_core::MetricsRegistry;

use super::{ERROR_REQUESTS, REQUESTS, UNHANDLED_FAULTS};
use crate::config::MetricsOptions;
use crate::pipeline::{Middleware, Next, RequestContext};

/// Request and error-rate meters.
///
/// Every completed request marks `http_requests`. A 4xx/5xx response, or a downstream `Err`,
/// also marks `http_error_requests`. The downstream result is returned untouched.
pub struct ErrorMeter {
    registry: Arc<dyn MetricsRegistry>,
    options: Arc<MetricsOptions>,
}

impl ErrorMeter {
    pub fn new(registry: Arc<dyn MetricsRegistry>, options: Arc<MetricsOptions>) -> Self {
        Self { registry, options }
    }

    fn record(&self, ctx: &RequestContext, res: &Result<Response>) {
        match res {
            Ok(resp) => {
                let status = resp.status();
                if self.options.is_ignored_status(status.as_u16()) {
                    return;
                }
                self.registry.mark_meter(REQUESTS, &[]);
                if status.is_client_error() || status.is_server_error() {
                    self.registry.mark_meter(
                        ERROR_REQUESTS,
                        &[("route", ctx.route_or_path()), ("status", status.as_str())],
                    );
                }
            }
            Err(e) => {
                self.registry.mark_meter(REQUESTS, &[]);
                // The host turns an unhandled fault into a 500.
                self.registry.mark_meter(
                    ERROR_REQUESTS,
                    &[("route", ctx.route_or_path()), ("status", "500")],
                );
                self.registry.mark_meter(UNHANDLED_FAULTS, &[("kind", e.kind().as_str())]);
                tracing::debug!(route = %ctx.route_or_path(), error = %e, "downstream fault recorded");
            }
        }
    }
}

#[async_trait]
impl Middleware for ErrorMeter {
    fn name(&self) -> &'static str {
        "error_meter"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if !ctx.is_tracked() {
            return next.run(ctx, req).await;
        }
        let res = next.run(ctx, req).await;
        self.record(ctx, &res);
        res
    }
}
