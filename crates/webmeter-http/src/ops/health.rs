//! Health-check registry and endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;

use webmeter_core::error::Result;

use super::json_response;
use crate::pipeline::{Middleware, Next, RequestContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    fn rank(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded(_) => 1,
            HealthStatus::Unhealthy(_) => 2,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded(_) => "degraded",
            HealthStatus::Unhealthy(_) => "unhealthy",
        }
    }
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> HealthStatus;
}

struct FnCheck<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> HealthCheck for FnCheck<F>
where
    F: Fn() -> HealthStatus + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> HealthStatus {
        (self.f)()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub checks: BTreeMap<String, HealthStatus>,
}

impl HealthReport {
    pub fn is_unhealthy(&self) -> bool {
        self.status == "unhealthy"
    }
}

/// Named health checks, run concurrently on demand.
#[derive(Default)]
pub struct HealthRegistry {
    checks: DashMap<String, Arc<dyn HealthCheck>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self { checks: DashMap::new() }
    }

    /// Register (or replace) a check under its name.
    pub fn register(&self, check: Arc<dyn HealthCheck>) {
        self.checks.insert(check.name().to_string(), check);
    }

    /// Register a synchronous closure as a check.
    pub fn register_fn<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn() -> HealthStatus + Send + Sync + 'static,
    {
        self.register(Arc::new(FnCheck { name: name.into(), f }));
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub async fn run_all(&self) -> HealthReport {
        // Clone out of the map so no shard lock is held across the awaits.
        let checks: Vec<Arc<dyn HealthCheck>> =
            self.checks.iter().map(|e| Arc::clone(e.value())).collect();

        let results = join_all(checks.iter().map(|c| async move {
            (c.name().to_string(), c.check().await)
        }))
        .await;

        let worst = results
            .iter()
            .map(|(_, s)| s)
            .max_by_key(|s| s.rank())
            .map(HealthStatus::label)
            .unwrap_or("healthy");

        HealthReport { status: worst, checks: results.into_iter().collect() }
    }
}

pub struct HealthEndpoint {
    path: String,
    registry: Arc<HealthRegistry>,
}

impl HealthEndpoint {
    pub fn new(path: impl Into<String>, registry: Arc<HealthRegistry>) -> Self {
        Self { path: path.into(), registry }
    }
}

#[async_trait]
impl Middleware for HealthEndpoint {
    fn name(&self) -> &'static str {
        "health_endpoint"
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response> {
        if ctx.path != self.path {
            return next.run(ctx, req).await;
        }
        let report = self.registry.run_all().await;
        let status = if report.is_unhealthy() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::OK
        };
        json_response(status, &report)
    }
}
