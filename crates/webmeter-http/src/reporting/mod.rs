//! Periodic reporting of registry snapshots.
//!
//! A `Reporter` is a named sink with its own interval and timeout. The `ReportScheduler`
//! drives one task per reporter, gated on the host lifecycle signals.

pub mod file;
pub mod log;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use webmeter_core::error::{Result, WebMeterError};
use webmeter_core::MetricSnapshot;

use crate::config::{ReporterKind, ReportingSection};

pub use file::FileReporter;
pub use log::LogReporter;
pub use scheduler::{ReportScheduler, ReporterState, ReporterStatus, SchedulerHandle};

/// Counter of failed or timed-out flushes, tagged by reporter name.
pub const FLUSH_ERRORS: &str = "webmeter_reporter_flush_errors_total";

const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Reporter: Send + Sync {
    fn name(&self) -> &str;

    /// Time between flush cycles.
    fn interval(&self) -> Duration;

    /// Upper bound for a single flush.
    fn timeout(&self) -> Duration {
        DEFAULT_FLUSH_TIMEOUT
    }

    async fn flush(&self, snapshot: &MetricSnapshot) -> Result<()>;
}

/// Instantiate the built-in reporters named in the config.
pub fn build_reporters(section: &ReportingSection) -> Result<Vec<Arc<dyn Reporter>>> {
    section
        .reporters
        .iter()
        .map(|rc| -> Result<Arc<dyn Reporter>> {
            match rc.kind {
                ReporterKind::Log => {
                    Ok(Arc::new(LogReporter::new(rc.name.clone(), rc.interval(), rc.timeout())))
                }
                ReporterKind::File => {
                    let path = rc.path.clone().ok_or_else(|| {
                        WebMeterError::Config(format!("reporter {}: file reporters require a path", rc.name))
                    })?;
                    Ok(Arc::new(FileReporter::new(rc.name.clone(), path, rc.interval(), rc.timeout())))
                }
            }
        })
        .collect()
}
