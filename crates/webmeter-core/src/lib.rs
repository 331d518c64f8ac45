//! webmeter core: the metric capability registry, snapshots, and the shared error type.
//!
//! This crate carries no transport or runtime dependencies so the registry can be consumed by
//! the HTTP instrumentation, by reporters, and by tests alike.
//!
//! # Guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths surface as
//! `WebMeterError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod registry;
pub mod snapshot;

pub use error::{ErrorKind, Result, WebMeterError};
pub use registry::{InMemoryRegistry, MetricsRegistry};
pub use snapshot::MetricSnapshot;
