//! Shared error type across webmeter crates.

use thiserror::Error;

/// Stable error classification. Used as a metric tag and in JSON error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Startup-time misconfiguration or missing prerequisite.
    Configuration,
    /// Malformed request data.
    BadRequest,
    /// Downstream handler failed while serving a request.
    Downstream,
    /// A reporter flush failed.
    Reporter,
    /// A reporter flush exceeded its timeout.
    Timeout,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in tags and responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Downstream => "DOWNSTREAM",
            ErrorKind::Reporter => "REPORTER",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, WebMeterError>;

/// Unified error type used by core and http crates.
#[derive(Debug, Error)]
pub enum WebMeterError {
    #[error("configuration: {0}")]
    Config(String),
    #[error("missing required service: {0}")]
    MissingService(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("downstream: {0}")]
    Downstream(String),
    #[error("reporter {reporter} failed: {msg}")]
    Reporter { reporter: String, msg: String },
    #[error("reporter {0} timed out")]
    Timeout(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl WebMeterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WebMeterError::Config(_) | WebMeterError::MissingService(_) => ErrorKind::Configuration,
            WebMeterError::BadRequest(_) => ErrorKind::BadRequest,
            WebMeterError::Downstream(_) => ErrorKind::Downstream,
            WebMeterError::Reporter { .. } => ErrorKind::Reporter,
            WebMeterError::Timeout(_) => ErrorKind::Timeout,
            WebMeterError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for errors that must abort startup.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
