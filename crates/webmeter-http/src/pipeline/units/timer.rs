use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use tokio::time::Instant;

use webmeter_core::error::Result;
use webmeter_core::MetricsRegistry;

use super::REQUEST_DURATION;
use crate::config::MetricsOptions;
use crate::pipeline::{Middleware, Next, RequestContext};

/// Per-request wall-clock timer, tagged by method and route template (raw path when the
/// application reported none).
///
/// The measured window is written to `RequestContext::elapsed` so outer units can reuse it.
pub struct RequestTimer {
    registry: Arc<dyn MetricsRegistry>,
    options: Arc<MetricsOptions>,
}

impl RequestTimer {
    pub fn new(registry: Arc<dyn MetricsRegistry>, options: Arc<MetricsOptions>) -> Self {
        Self { registry, options }
    }
}

/// Records on drop unless stopped, so a panicking or cancelled request is still timed.
struct TimerGuard<'a> {
    registry: &'a dyn MetricsRegistry,
    method: String,
    path: String,
    start: Instant,
    armed: bool,
}

impl<'a> TimerGuard<'a> {
    fn start(registry: &'a dyn MetricsRegistry, ctx: &RequestContext) -> Self {
        Self {
            registry,
            method: ctx.method.to_string(),
            path: ctx.path.clone(),
            start: Instant::now(),
            armed: true,
        }
    }

    fn stop(mut self) -> Duration {
        self.armed = false;
        self.start.elapsed()
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.record_timer(
                REQUEST_DURATION,
                &[("method", self.method.as_str()), ("route", self.path.as_str())],
                self.start.elapsed(),
            );
        }
    }
}

#[async_trait]
impl Middleware for RequestTimer {
    fn name(&self) -> &'static str {
        "request_timer"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if !ctx.is_tracked() {
            return next.run(ctx, req).await;
        }
        let guard = TimerGuard::start(self.registry.as_ref(), ctx);
        let res = next.run(ctx, req).await;
        let elapsed = guard.stop();
        ctx.elapsed = Some(elapsed);

        let ignored = ctx.status_code().is_some_and(|s| self.options.is_ignored_status(s));
        if !ignored {
            let method = ctx.method.to_string();
            self.registry.record_timer(
                REQUEST_DURATION,
                &[("method", method.as_str()), ("route", ctx.route_or_path())],
                elapsed,
            );
        }
        res
    }
}
