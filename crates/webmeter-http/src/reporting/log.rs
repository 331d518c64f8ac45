use std::time::Duration;

use async_trait::async_trait;

use webmeter_core::error::Result;
use webmeter_core::MetricSnapshot;

use super::Reporter;

/// Emits a structured `tracing` summary of each snapshot. Per-series detail at `debug`.
pub struct LogReporter {
    name: String,
    interval: Duration,
    timeout: Duration,
}

impl LogReporter {
    pub fn new(name: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self { name: name.into(), interval, timeout }
    }
}

#[async_trait]
impl Reporter for LogReporter {
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
        tracing::info!(
            reporter = %self.name,
            context = %snapshot.context,
            counters = snapshot.counters.len(),
            gauges = snapshot.gauges.len(),
            meters = snapshot.meters.len(),
            histograms = snapshot.histograms.len(),
            timers = snapshot.timers.len(),
            "metrics snapshot"
        );
        for m in &snapshot.meters {
            tracing::debug!(reporter = %self.name, metric = %m.name, labels = ?m.labels, count = m.count, mean_rate = m.mean_rate);
        }
        for t in &snapshot.timers {
            tracing::debug!(reporter = %self.name, metric = %t.name, labels = ?t.labels, count = t.count, mean_micros = t.mean(), max_micros = t.max);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flush_never_fails() {
        let r = LogReporter::new("console", Duration::from_secs(1), Duration::from_millis(100));
        assert!(r.flush(&MetricSnapshot::default()).await.is_ok());
        assert_eq!(r.name(), "console");
    }
}
