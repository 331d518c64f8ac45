//! Exposition endpoints.
//!
//! Each endpoint is a chain unit that short-circuits: on an exact path match it answers the
//! request itself, otherwise it delegates unchanged.
//!
//! - ping        : liveness, plain `pong`
//! - health      : aggregated health checks (JSON, 503 when unhealthy)
//! - metrics-text: Prometheus text format
//! - metrics     : structured JSON snapshot
//! - env         : process/environment info (JSON)

pub mod env_info;
pub mod health;
pub mod metrics;
pub mod ping;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use webmeter_core::error::{Result, WebMeterError};

pub use env_info::{EnvInfo, EnvInfoEndpoint};
pub use health::{HealthCheck, HealthEndpoint, HealthRegistry, HealthReport, HealthStatus};
pub use metrics::{MetricsEndpoint, MetricsTextEndpoint};
pub use ping::PingEndpoint;

pub(crate) const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub(crate) const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response> {
    let body = serde_json::to_vec(body)
        .map_err(|e| WebMeterError::Internal(format!("serialize response failed: {e}")))?;
    Ok((status, [(header::CONTENT_TYPE, "application/json")], body).into_response())
}
