//! Host lifecycle signals.
//!
//! The host drives two one-shot signals: `started` (after it begins accepting traffic) and
//! `stopping` (before it stops accepting traffic). Background work in this crate only observes
//! them. Both are `CancellationToken`s so any number of tasks can await them and late
//! subscribers see an already-fired signal immediately.

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct HostLifecycle {
    started: CancellationToken,
    stopping: CancellationToken,
}

impl HostLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire "started". Idempotent.
    pub fn notify_started(&self) {
        if !self.started.is_cancelled() {
            tracing::info!("host started");
        }
        self.started.cancel();
    }

    /// Fire "stopping". Idempotent.
    pub fn notify_stopping(&self) {
        if !self.stopping.is_cancelled() {
            tracing::info!("host stopping");
        }
        self.stopping.cancel();
    }

    pub fn is_started(&self) -> bool {
        self.started.is_cancelled()
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.is_cancelled()
    }

    pub async fn started(&self) {
        self.started.cancelled().await
    }

    pub async fn stopping(&self) {
        self.stopping.cancelled().await
    }

    /// Token view of "stopping", for `select!` loops that need to hold it.
    pub fn stopping_token(&self) -> CancellationToken {
        self.stopping.clone()
    }
}
