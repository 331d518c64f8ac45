//! webmeter HTTP library entry.
//!
//! Wires the tracking units, exposition endpoints, and reporting scheduler around the
//! `webmeter-core` registry. Consumed by the demo binary (`main.rs`) and integration tests.

pub mod config;
pub mod lifecycle;
pub mod ops;
pub mod pipeline;
pub mod reporting;
pub mod router;
pub mod services;

pub use lifecycle::HostLifecycle;
pub use pipeline::{compose, AuthScheme, Chain, RouteTemplate};
pub use services::Services;
