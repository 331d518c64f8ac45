//! Chain composition.
//!
//! Outermost first:
//! 1. ping
//! 2. health (requires a health registry)
//! 3. metrics-text, metrics (only with metrics enabled)
//! 4. env info
//! 5. default tracking: active requests, [apdex], error meter / timer (per `timer_placement`),
//!    auth scheme, body size
//!
//! Apdex sits directly inside the active-request counter so it records after the error meter
//! and can read the timer's window. Without default tracking it is the only tracking unit.

use std::sync::Arc;

use webmeter_core::error::Result;

use super::units::{
    ActiveRequests, ApdexScorer, AuthSchemeTracker, BodySizeHistogram, ErrorMeter, RequestTimer,
};
use super::{Chain, Middleware};
use crate::config::TimerPlacement;
use crate::ops::{EnvInfoEndpoint, HealthEndpoint, MetricsEndpoint, MetricsTextEndpoint, PingEndpoint};
use crate::services::Services;

/// Build the chain once from `services`. Fails fast on a missing prerequisite.
pub fn compose(services: &Services) -> Result<Chain> {
    let metrics = services.metrics_options()?;
    let endpoints = services.endpoint_options()?;
    let registry = services.registry()?;

    let mut units: Vec<Arc<dyn Middleware>> = Vec::new();

    if endpoints.ping_enabled {
        units.push(Arc::new(PingEndpoint::new(endpoints.ping_path.clone())));
    }
    if endpoints.health_enabled {
        let health = services.health()?;
        units.push(Arc::new(HealthEndpoint::new(endpoints.health_path.clone(), health)));
    }
    if metrics.enabled {
        if endpoints.metrics_text_enabled {
            units.push(Arc::new(MetricsTextEndpoint::new(
                endpoints.metrics_text_path.clone(),
                Arc::clone(&registry),
            )));
        }
        if endpoints.metrics_enabled {
            units.push(Arc::new(MetricsEndpoint::new(
                endpoints.metrics_path.clone(),
                Arc::clone(&registry),
            )));
        }
    } else {
        tracing::debug!("metrics disabled; metrics endpoints and tracking omitted");
    }
    if endpoints.env_info_enabled {
        units.push(Arc::new(EnvInfoEndpoint::new(endpoints.env_info_path.clone())));
    }

    let apdex: Option<Arc<dyn Middleware>> = if metrics.apdex_active() {
        Some(Arc::new(ApdexScorer::new(Arc::clone(&registry), Arc::clone(&metrics))))
    } else {
        None
    };

    if metrics.default_tracking_active() {
        units.push(Arc::new(ActiveRequests::new(Arc::clone(&registry))));
        units.extend(apdex);

        let error_meter: Arc<dyn Middleware> =
            Arc::new(ErrorMeter::new(Arc::clone(&registry), Arc::clone(&metrics)));
        let timer: Arc<dyn Middleware> =
            Arc::new(RequestTimer::new(Arc::clone(&registry), Arc::clone(&metrics)));
        match metrics.timer_placement {
            TimerPlacement::InsideErrorMeter => units.extend([error_meter, timer]),
            TimerPlacement::OutsideErrorMeter => units.extend([timer, error_meter]),
        }

        units.push(Arc::new(AuthSchemeTracker::new(Arc::clone(&registry))));
        units.push(Arc::new(BodySizeHistogram::new(Arc::clone(&registry))));
    } else {
        units.extend(apdex);
    }

    let chain = Chain::new(units).with_options(metrics);
    tracing::debug!(units = ?chain.unit_names(), "instrumentation chain composed");
    Ok(chain)
}
