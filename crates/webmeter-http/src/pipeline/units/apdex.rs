use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use tokio::time::Instant;

use webmeter_core::error::Result;
use webmeter_core::MetricsRegistry;

use super::APDEX;
use crate::config::MetricsOptions;
use crate::pipeline::{Middleware, Next, RequestContext};

/// Apdex bucket for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApdexScore {
    Satisfied,
    Tolerating,
    Frustrated,
}

impl ApdexScore {
    /// `T <= L` satisfied, `L < T <= 4L` tolerating, `T > 4L` frustrated.
    pub fn classify(elapsed: Duration, target: Duration) -> Self {
        if elapsed <= target {
            ApdexScore::Satisfied
        } else if elapsed <= target.saturating_mul(4) {
            ApdexScore::Tolerating
        } else {
            ApdexScore::Frustrated
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApdexScore::Satisfied => "satisfied",
            ApdexScore::Tolerating => "tolerating",
            ApdexScore::Frustrated => "frustrated",
        }
    }
}

/// Apdex index from bucket counts: `(satisfied + tolerating / 2) / total`.
pub fn apdex_index(satisfied: u64, tolerating: u64, frustrated: u64) -> Option<f64> {
    let total = satisfied + tolerating + frustrated;
    if total == 0 {
        return None;
    }
    Some((satisfied as f64 + tolerating as f64 / 2.0) / total as f64)
}

/// Scores each request against the configured target latency.
///
/// Uses the timer's window from `RequestContext::elapsed` when an inner timer ran, otherwise
/// its own stopwatch. Downstream faults are scored as frustrated.
pub struct ApdexScorer {
    registry: Arc<dyn MetricsRegistry>,
    options: Arc<MetricsOptions>,
}

impl ApdexScorer {
    pub fn new(registry: Arc<dyn MetricsRegistry>, options: Arc<MetricsOptions>) -> Self {
        Self { registry, options }
    }
}

#[async_trait]
impl Middleware for ApdexScorer {
    fn name(&self) -> &'static str {
        "apdex"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if !ctx.is_tracked() {
            return next.run(ctx, req).await;
        }
        let start = Instant::now();
        let res = next.run(ctx, req).await;

        if ctx.status_code().is_some_and(|s| self.options.is_ignored_status(s)) {
            return res;
        }
        let score = if res.is_err() {
            ApdexScore::Frustrated
        } else {
            let elapsed = ctx.elapsed.unwrap_or_else(|| start.elapsed());
            ApdexScore::classify(elapsed, self.options.apdex_target())
        };
        self.registry.increment_counter(APDEX, &[("score", score.as_str())], 1);
        res
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::pipeline::units::testing::{as_dyn, registry, request, run_with};
    use crate::pipeline::{downstream_fn, Chain};
    use axum::http::{Method, StatusCode};
    use webmeter_core::WebMeterError;

    const L: Duration = Duration::from_millis(100);

    #[test]
    fn classification_against_a_100ms_target() {
        assert_eq!(ApdexScore::classify(Duration::from_millis(80), L), ApdexScore::Satisfied);
        assert_eq!(ApdexScore::classify(Duration::from_millis(250), L), ApdexScore::Tolerating);
        assert_eq!(ApdexScore::classify(Duration::from_millis(500), L), ApdexScore::Frustrated);
    }

    #[test]
    fn bucket_edges_are_inclusive() {
        assert_eq!(ApdexScore::classify(L, L), ApdexScore::Satisfied);
        assert_eq!(ApdexScore::classify(L * 4, L), ApdexScore::Tolerating);
        assert_eq!(ApdexScore::classify(L * 4 + Duration::from_nanos(1), L), ApdexScore::Frustrated);
    }

    #[test]
    fn index_weights_tolerating_by_half() {
        assert_eq!(apdex_index(0, 0, 0), None);
        assert_eq!(apdex_index(2, 2, 0), Some(0.75));
    }

    fn unit(reg: &Arc<webmeter_core::InMemoryRegistry>) -> Arc<dyn Middleware> {
        let options = MetricsOptions { apdex_target_ms: 100, ..MetricsOptions::default() };
        Arc::new(ApdexScorer::new(as_dyn(reg), Arc::new(options)))
    }

    #[tokio::test(start_paused = true)]
    async fn scores_requests_by_their_own_window() {
        let reg = registry();
        for ms in [80, 250, 500] {
            run_with(unit(&reg), request(Method::GET, "/"), StatusCode::OK, Duration::from_millis(ms))
                .await
                .unwrap();
        }
        let snap = reg.snapshot();
        assert_eq!(snap.counter(APDEX, &[("score", "satisfied")]), Some(1));
        assert_eq!(snap.counter(APDEX, &[("score", "tolerating")]), Some(1));
        assert_eq!(snap.counter(APDEX, &[("score", "frustrated")]), Some(1));
    }

    #[tokio::test]
    async fn faults_are_frustrated() {
        let reg = registry();
        let chain = Chain::new(vec![unit(&reg)]);
        let res = chain
            .handle(
                request(Method::GET, "/"),
                downstream_fn(|_req| async { Err(WebMeterError::Downstream("x".into())) }),
            )
            .await;
        assert!(res.is_err());
        assert_eq!(reg.snapshot().counter(APDEX, &[("score", "frustrated")]), Some(1));
    }
}
