//! Config loader (strict parsing).

pub mod schema;

use std::fs;

use webmeter_core::error::{Result, WebMeterError};

pub use schema::{
    EndpointOptions, MetricsOptions, ReporterConfig, ReporterKind, ReportingSection,
    TimerPlacement, WebMeterConfig,
};

pub fn load_from_file(path: &str) -> Result<WebMeterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| WebMeterError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<WebMeterConfig> {
    let cfg: WebMeterConfig = serde_yaml::from_str(s)
        .map_err(|e| WebMeterError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
