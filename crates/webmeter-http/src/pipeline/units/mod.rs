//! Tracking units.
//!
//! Each unit records exactly one measurement into the registry. They are independent: the
//! composer decides which are active and in which order.

pub mod active_requests;
pub mod apdex;
pub mod auth_scheme;
pub mod body_size;
pub mod error_meter;
pub mod timer;

pub use active_requests::ActiveRequests;
pub use apdex::{ApdexScore, ApdexScorer};
pub use auth_scheme::AuthSchemeTracker;
pub use body_size::BodySizeHistogram;
pub use error_meter::ErrorMeter;
pub use timer::RequestTimer;

/// Gauge of in-flight requests.
pub const ACTIVE_REQUESTS: &str = "http_active_requests";
/// Meter marked once per completed request.
pub const REQUESTS: &str = "http_requests";
/// Meter marked for 4xx/5xx responses and downstream faults.
pub const ERROR_REQUESTS: &str = "http_error_requests";
/// Meter marked per downstream fault, tagged by fault kind.
pub const UNHANDLED_FAULTS: &str = "http_unhandled_faults";
pub const REQUEST_DURATION: &str = "http_request_duration_micros";
pub const AUTH_SCHEME: &str = "http_requests_by_auth_scheme_total";
pub const REQUEST_BODY_SIZE: &str = "http_request_body_bytes";
pub const APDEX: &str = "http_apdex_total";
