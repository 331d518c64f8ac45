use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use tokio::time::Instant;

use webmeter_core::error::Result;

use super::json_response;
use crate::pipeline::{Middleware, Next, RequestContext};

#[derive(Debug, Clone, Serialize)]
pub struct EnvInfo {
    pub version: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
    pub process_id: u32,
    pub host_name: String,
    /// Wall-clock millis at which the endpoint was composed, not process start.
    pub started_at_ms: u64,
    /// Seconds since the endpoint was composed, not since process start.
    pub uptime_secs: u64,
}

/// Environment info captured at composition time; uptime is computed per request.
///
/// Composing the chain again resets `started_at_ms` and `uptime_secs`.
pub struct EnvInfoEndpoint {
    path: String,
    started: Instant,
    started_at_ms: u64,
    host_name: String,
}

impl EnvInfoEndpoint {
    pub fn new(path: impl Into<String>) -> Self {
        let host_name = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            path: path.into(),
            started: Instant::now(),
            started_at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            host_name,
        }
    }

    pub fn info(&self) -> EnvInfo {
        EnvInfo {
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            process_id: std::process::id(),
            host_name: self.host_name.clone(),
            started_at_ms: self.started_at_ms,
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}

#[async_trait]
impl Middleware for EnvInfoEndpoint {
    fn name(&self) -> &'static str {
        "env_info_endpoint"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if ctx.path != self.path {
            return next.run(ctx, req).await;
        }
        json_response(StatusCode::OK, &self.info())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn uptime_counts_from_composition() {
        let endpoint = EnvInfoEndpoint::new("/env");
        assert_eq!(endpoint.info().uptime_secs, 0);

        tokio::time::advance(Duration::from_secs(5)).await;
        let info = endpoint.info();
        assert_eq!(info.uptime_secs, 5);
        assert_eq!(info.started_at_ms, endpoint.started_at_ms);

        let recomposed = EnvInfoEndpoint::new("/env");
        assert_eq!(recomposed.info().uptime_secs, 0);
    }
}
