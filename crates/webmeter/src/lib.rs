//! Top-level facade crate for webmeter.
//!
//! Re-exports the registry core and the HTTP instrumentation library so users can depend on a
//! single crate.

pub mod core {
    pub use webmeter_core::*;
}

pub mod http {
    pub use webmeter_http::*;
}
