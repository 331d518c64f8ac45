//! Services the host hands to the composer and the reporting scheduler.
//!
//! Everything is optional at construction time; the composer checks prerequisites and fails
//! with a configuration error instead of panicking later on the request path.

use std::sync::Arc;
use std::time::Duration;

use webmeter_core::error::{Result, WebMeterError};
use webmeter_core::{InMemoryRegistry, MetricsRegistry};

use crate::config::{EndpointOptions, MetricsOptions, WebMeterConfig};
use crate::lifecycle::HostLifecycle;
use crate::ops::HealthRegistry;
use crate::reporting::{build_reporters, ReportScheduler, Reporter};

#[derive(Clone, Default)]
pub struct Services {
    metrics_options: Option<Arc<MetricsOptions>>,
    endpoint_options: Option<Arc<EndpointOptions>>,
    registry: Option<Arc<dyn MetricsRegistry>>,
    health: Option<Arc<HealthRegistry>>,
    reporters: Vec<Arc<dyn Reporter>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full set from a validated config: options, an in-memory registry carrying
    /// the context label and global tags, and the configured reporters.
    ///
    /// The health registry is not created here; hosts register checks and attach it with
    /// `with_health`.
    pub fn from_config(cfg: &WebMeterConfig) -> Result<Self> {
        cfg.validate()?;
        let registry = InMemoryRegistry::new()
            .with_context(cfg.metrics.context_label.clone())
            .with_global_tags(cfg.metrics.global_tags.clone());
        let reporters = if cfg.reporting.enabled {
            build_reporters(&cfg.reporting)?
        } else {
            Vec::new()
        };
        Ok(Self {
            metrics_options: Some(Arc::new(cfg.metrics.clone())),
            endpoint_options: Some(Arc::new(cfg.endpoints.clone())),
            registry: Some(Arc::new(registry)),
            health: None,
            reporters,
        })
    }

    pub fn with_metrics_options(mut self, options: MetricsOptions) -> Self {
        self.metrics_options = Some(Arc::new(options));
        self
    }

    pub fn with_endpoint_options(mut self, options: EndpointOptions) -> Self {
        self.endpoint_options = Some(Arc::new(options));
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn MetricsRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_health(mut self, health: Arc<HealthRegistry>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn metrics_options(&self) -> Result<Arc<MetricsOptions>> {
        self.metrics_options
            .clone()
            .ok_or(WebMeterError::MissingService("metrics options"))
    }

    pub fn endpoint_options(&self) -> Result<Arc<EndpointOptions>> {
        self.endpoint_options
            .clone()
            .ok_or(WebMeterError::MissingService("endpoint options"))
    }

    pub fn registry(&self) -> Result<Arc<dyn MetricsRegistry>> {
        self.registry
            .clone()
            .ok_or(WebMeterError::MissingService("metrics registry"))
    }

    pub fn health(&self) -> Result<Arc<HealthRegistry>> {
        self.health
            .clone()
            .ok_or(WebMeterError::MissingService("health check registry"))
    }

    pub fn reporters(&self) -> &[Arc<dyn Reporter>] {
        &self.reporters
    }

    /// Scheduler over the registered reporters. Requires a registry.
    pub fn scheduler(&self, lifecycle: HostLifecycle, grace: Duration) -> Result<ReportScheduler> {
        Ok(ReportScheduler::new(self.registry()?, self.reporters.clone(), lifecycle, grace))
    }
}
