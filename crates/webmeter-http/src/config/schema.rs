use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::Deserialize;
use webmeter_core::error::{Result, WebMeterError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebMeterConfig {
    pub version: u32,

    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub metrics: MetricsOptions,

    #[serde(default)]
    pub endpoints: EndpointOptions,

    #[serde(default)]
    pub reporting: ReportingSection,
}

impl WebMeterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WebMeterError::Config(format!(
                "unsupported config version {} (expected 1)",
                self.version
            )));
        }
        self.metrics.validate()?;
        self.endpoints.validate()?;
        self.reporting.validate()?;
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

// --------------------
// Metrics
// --------------------

/// Where the per-request timer sits relative to the error meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerPlacement {
    /// Timer stops before the error meter classifies the outcome.
    #[default]
    InsideErrorMeter,
    /// Error meter records first, then the timer stops.
    OutsideErrorMeter,
}

/// Global metric toggles. Resolved once at startup, read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub default_tracking_enabled: bool,

    #[serde(default = "default_true")]
    pub apdex_tracking_enabled: bool,

    #[serde(default = "default_apdex_target_ms")]
    pub apdex_target_ms: u64,

    #[serde(default = "default_context_label")]
    pub context_label: String,

    #[serde(default)]
    pub global_tags: BTreeMap<String, String>,

    /// Responses with these statuses are not timed, scored, or counted as errors.
    #[serde(default)]
    pub ignored_status_codes: Vec<u16>,

    /// Path prefixes that bypass all tracking units.
    #[serde(default)]
    pub ignored_routes: Vec<String>,

    #[serde(default)]
    pub timer_placement: TimerPlacement,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            default_tracking_enabled: true,
            apdex_tracking_enabled: true,
            apdex_target_ms: default_apdex_target_ms(),
            context_label: default_context_label(),
            global_tags: BTreeMap::new(),
            ignored_status_codes: Vec::new(),
            ignored_routes: Vec::new(),
            timer_placement: TimerPlacement::default(),
        }
    }
}

impl MetricsOptions {
    pub fn validate(&self) -> Result<()> {
        if !(1..=60_000).contains(&self.apdex_target_ms) {
            return Err(WebMeterError::Config(
                "metrics.apdex_target_ms must be between 1 and 60000".into(),
            ));
        }
        if let Some(code) = self.ignored_status_codes.iter().find(|c| !(100..=599).contains(*c)) {
            return Err(WebMeterError::Config(format!(
                "metrics.ignored_status_codes contains invalid status {code}"
            )));
        }
        if let Some(r) = self.ignored_routes.iter().find(|r| !r.starts_with('/')) {
            return Err(WebMeterError::Config(format!(
                "metrics.ignored_routes entry must start with '/': {r}"
            )));
        }
        Ok(())
    }

    pub fn apdex_target(&self) -> Duration {
        Duration::from_millis(self.apdex_target_ms)
    }

    pub fn default_tracking_active(&self) -> bool {
        self.enabled && self.default_tracking_enabled
    }

    pub fn apdex_active(&self) -> bool {
        self.enabled && self.apdex_tracking_enabled
    }

    pub fn is_ignored_route(&self, path: &str) -> bool {
        self.ignored_routes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn is_ignored_status(&self, status: u16) -> bool {
        self.ignored_status_codes.contains(&status)
    }
}

fn default_true() -> bool {
    true
}
fn default_apdex_target_ms() -> u64 {
    500
}
fn default_context_label() -> String {
    "application".into()
}

// --------------------
// Endpoints
// --------------------

/// Which exposition endpoints are mounted, and where.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointOptions {
    #[serde(default = "default_true")]
    pub ping_enabled: bool,
    #[serde(default = "default_ping_path")]
    pub ping_path: String,

    #[serde(default)]
    pub health_enabled: bool,
    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_true")]
    pub metrics_text_enabled: bool,
    #[serde(default = "default_metrics_text_path")]
    pub metrics_text_path: String,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    #[serde(default = "default_true")]
    pub env_info_enabled: bool,
    #[serde(default = "default_env_info_path")]
    pub env_info_path: String,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            ping_enabled: true,
            ping_path: default_ping_path(),
            health_enabled: false,
            health_path: default_health_path(),
            metrics_text_enabled: true,
            metrics_text_path: default_metrics_text_path(),
            metrics_enabled: true,
            metrics_path: default_metrics_path(),
            env_info_enabled: true,
            env_info_path: default_env_info_path(),
        }
    }
}

impl EndpointOptions {
    /// All endpoints switched off.
    pub fn none() -> Self {
        Self {
            ping_enabled: false,
            health_enabled: false,
            metrics_text_enabled: false,
            metrics_enabled: false,
            env_info_enabled: false,
            ..Self::default()
        }
    }

    fn enabled_paths(&self) -> Vec<(&'static str, &str)> {
        [
            (self.ping_enabled, "ping_path", self.ping_path.as_str()),
            (self.health_enabled, "health_path", self.health_path.as_str()),
            (self.metrics_text_enabled, "metrics_text_path", self.metrics_text_path.as_str()),
            (self.metrics_enabled, "metrics_path", self.metrics_path.as_str()),
            (self.env_info_enabled, "env_info_path", self.env_info_path.as_str()),
        ]
        .into_iter()
        .filter(|(on, _, _)| *on)
        .map(|(_, field, path)| (field, path))
        .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (field, path) in self.enabled_paths() {
            if !path.starts_with('/') {
                return Err(WebMeterError::Config(format!(
                    "endpoints.{field} must start with '/': {path}"
                )));
            }
            if !seen.insert(path) {
                return Err(WebMeterError::Config(format!(
                    "endpoints.{field} duplicates another enabled endpoint: {path}"
                )));
            }
        }
        Ok(())
    }
}

fn default_ping_path() -> String {
    "/ping".into()
}
fn default_health_path() -> String {
    "/health".into()
}
fn default_metrics_text_path() -> String {
    "/metrics-text".into()
}
fn default_metrics_path() -> String {
    "/metrics".into()
}
fn default_env_info_path() -> String {
    "/env".into()
}

// --------------------
// Reporting
// --------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportingSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Grace period given to an in-flight flush once the host is stopping.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    #[serde(default)]
    pub reporters: Vec<ReporterConfig>,
}

impl Default for ReportingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            shutdown_grace_ms: default_shutdown_grace_ms(),
            reporters: Vec::new(),
        }
    }
}

impl ReportingSection {
    pub fn validate(&self) -> Result<()> {
        if self.shutdown_grace_ms > 60_000 {
            return Err(WebMeterError::Config(
                "reporting.shutdown_grace_ms must be at most 60000".into(),
            ));
        }
        let mut names = HashSet::new();
        for r in &self.reporters {
            r.validate()?;
            if !names.insert(r.name.as_str()) {
                return Err(WebMeterError::Config(format!(
                    "reporting.reporters has duplicate name: {}",
                    r.name
                )));
            }
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReporterKind {
    /// Structured `tracing` summary.
    Log,
    /// Prometheus text written to a file.
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReporterConfig {
    pub name: String,
    pub kind: ReporterKind,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub path: Option<String>,
}

impl ReporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WebMeterError::Config("reporter name must not be empty".into()));
        }
        if self.interval_ms == 0 {
            return Err(WebMeterError::Config(format!(
                "reporter {}: interval_ms must be at least 1",
                self.name
            )));
        }
        if self.timeout_ms == 0 {
            return Err(WebMeterError::Config(format!(
                "reporter {}: timeout_ms must be at least 1",
                self.name
            )));
        }
        if self.kind == ReporterKind::File && self.path.as_deref().map_or(true, str::is_empty) {
            return Err(WebMeterError::Config(format!(
                "reporter {}: file reporters require a path",
                self.name
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_interval_ms() -> u64 {
    10_000
}
fn default_timeout_ms() -> u64 {
    5_000
}
