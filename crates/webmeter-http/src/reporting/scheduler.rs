//! Reporter scheduling.
//!
//! One tokio task per reporter. Per reporter: Idle -> Scheduled -> Running -> (Scheduled |
//! Stopped). Nothing is flushed before the host signals "started"; once "stopping" fires no new
//! cycle begins and an in-flight flush gets at most the grace period.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use webmeter_core::error::{Result, WebMeterError};
use webmeter_core::MetricsRegistry;

use super::{Reporter, FLUSH_ERRORS};
use crate::lifecycle::HostLifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    /// Waiting for the host to start.
    Idle,
    /// Waiting for the next tick.
    Scheduled,
    /// Flush in flight.
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReporterStatus {
    pub state: ReporterState,
    /// Completed successful flushes.
    pub flushes: u64,
    /// Failed, timed-out or abandoned flushes.
    pub failures: u64,
}

impl ReporterStatus {
    fn idle() -> Self {
        Self { state: ReporterState::Idle, flushes: 0, failures: 0 }
    }
}

type StatusTable = Arc<DashMap<String, ReporterStatus>>;

pub struct ReportScheduler {
    registry: Arc<dyn MetricsRegistry>,
    reporters: Vec<Arc<dyn Reporter>>,
    lifecycle: HostLifecycle,
    grace: Duration,
}

impl ReportScheduler {
    pub fn new(
        registry: Arc<dyn MetricsRegistry>,
        reporters: Vec<Arc<dyn Reporter>>,
        lifecycle: HostLifecycle,
        grace: Duration,
    ) -> Self {
        Self { registry, reporters, lifecycle, grace }
    }

    /// Spawn one task per reporter and return immediately. Tasks wait for "started" themselves.
    pub fn spawn(self) -> SchedulerHandle {
        let statuses: StatusTable = Arc::new(DashMap::new());
        let mut tasks = Vec::with_capacity(self.reporters.len());

        for reporter in self.reporters {
            statuses.insert(reporter.name().to_string(), ReporterStatus::idle());
            let worker = Worker {
                name: reporter.name().to_string(),
                reporter,
                registry: Arc::clone(&self.registry),
                lifecycle: self.lifecycle.clone(),
                stopping: self.lifecycle.stopping_token(),
                grace: self.grace,
                statuses: Arc::clone(&statuses),
            };
            tasks.push(tokio::spawn(worker.run()));
        }

        debug!(reporters = tasks.len(), "report scheduler spawned");
        SchedulerHandle { statuses, tasks }
    }
}

/// Observe and join the reporter tasks.
pub struct SchedulerHandle {
    statuses: StatusTable,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn state(&self, reporter: &str) -> Option<ReporterState> {
        self.status(reporter).map(|s| s.state)
    }

    pub fn status(&self, reporter: &str) -> Option<ReporterStatus> {
        self.statuses.get(reporter).map(|s| *s)
    }

    pub fn reporter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.statuses.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Wait for every reporter task to exit. Tasks only exit after "stopping".
    pub async fn join(self) {
        for res in join_all(self.tasks).await {
            if let Err(e) = res {
                warn!(error = %e, "reporter task aborted");
            }
        }
    }
}

struct Worker {
    name: String,
    reporter: Arc<dyn Reporter>,
    registry: Arc<dyn MetricsRegistry>,
    lifecycle: HostLifecycle,
    stopping: CancellationToken,
    grace: Duration,
    statuses: StatusTable,
}

impl Worker {
    async fn run(self) {
        tokio::select! {
            biased;
            _ = self.stopping.cancelled() => {
                self.set_state(ReporterState::Stopped);
                debug!(reporter = %self.name, "stopped before host started");
                return;
            }
            _ = self.lifecycle.started() => {}
        }

        let period = self.reporter.interval().max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.set_state(ReporterState::Scheduled);
        info!(reporter = %self.name, interval_ms = period.as_millis() as u64, "reporter scheduled");

        loop {
            tokio::select! {
                biased;
                _ = self.stopping.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.set_state(ReporterState::Running);
            let snapshot = self.registry.snapshot();
            // A panicking flush is a failed cycle, not a dead reporter.
            let guarded = AssertUnwindSafe(self.reporter.flush(&snapshot))
                .catch_unwind()
                .map(|r| {
                    r.unwrap_or_else(|_| {
                        Err(WebMeterError::Reporter {
                            reporter: self.name.clone(),
                            msg: "flush panicked".into(),
                        })
                    })
                });
            let flush = timeout(self.reporter.timeout(), guarded);
            tokio::pin!(flush);

            let outcome = tokio::select! {
                biased;
                r = &mut flush => Some(r),
                _ = self.stopping.cancelled() => None,
            };

            match outcome {
                Some(r) => self.record(r),
                None => {
                    match timeout(self.grace, &mut flush).await {
                        Ok(r) => self.record(r),
                        Err(_) => {
                            warn!(reporter = %self.name, grace_ms = self.grace.as_millis() as u64, "flush abandoned at shutdown");
                            self.count_failure();
                        }
                    }
                    break;
                }
            }
            self.set_state(ReporterState::Scheduled);
        }

        self.set_state(ReporterState::Stopped);
        info!(reporter = %self.name, "reporter stopped");
    }

    fn record(&self, outcome: std::result::Result<Result<()>, tokio::time::error::Elapsed>) {
        match outcome {
            Ok(Ok(())) => {
                if let Some(mut s) = self.statuses.get_mut(&self.name) {
                    s.flushes += 1;
                }
            }
            Ok(Err(e)) => {
                warn!(reporter = %self.name, error = %e, "flush failed");
                self.count_failure();
            }
            Err(_) => {
                warn!(reporter = %self.name, timeout_ms = self.reporter.timeout().as_millis() as u64, "flush timed out");
                self.count_failure();
            }
        }
    }

    fn count_failure(&self) {
        self.registry
            .increment_counter(FLUSH_ERRORS, &[("reporter", self.name.as_str())], 1);
        if let Some(mut s) = self.statuses.get_mut(&self.name) {
            s.failures += 1;
        }
    }

    fn set_state(&self, state: ReporterState) {
        if let Some(mut s) = self.statuses.get_mut(&self.name) {
            s.state = state;
        }
    }
}
