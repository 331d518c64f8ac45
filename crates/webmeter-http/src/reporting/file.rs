use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use webmeter_core::error::{Result, WebMeterError};
use webmeter_core::MetricSnapshot;

use super::Reporter;

/// Writes the Prometheus text exposition to a file.
///
/// Each flush writes a sibling `.tmp` file and renames it over the target, so readers never
/// see a partial snapshot.
pub struct FileReporter {
    name: String,
    path: PathBuf,
    interval: Duration,
    timeout: Duration,
}

impl FileReporter {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self { name: name.into(), path: path.into(), interval, timeout }
    }

    fn fail(&self, msg: String) -> WebMeterError {
        WebMeterError::Reporter { reporter: self.name.clone(), msg }
    }
}

#[async_trait]
impl Reporter for FileReporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn flush(&self, snapshot: &MetricSnapshot) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, snapshot.render_text())
            .await
            .map_err(|e| self.fail(format!("write {} failed: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.fail(format!("rename to {} failed: {e}", self.path.display())))?;
        Ok(())
    }
}
