//! Per-request state threaded through the chain.

use std::time::Duration;

use axum::extract::Request;
use axum::http::{header, Method, StatusCode};
use axum::response::Response;

use webmeter_core::error::{ErrorKind, Result};

/// Route template the application matched (e.g. `/items/:id`).
///
/// Downstream handlers insert it into the *response* extensions; the chain copies it into the
/// context once the downstream returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate(pub String);

/// Authentication scheme resolved by the application's auth layer (e.g. `bearer`).
///
/// Carried the same way as `RouteTemplate`: response extensions, read post-downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthScheme(pub String);

/// Transient state for one request. Created at chain entry, dropped at chain exit.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub route: Option<String>,
    pub status: Option<StatusCode>,
    /// Wall-clock time of the timed window, set by the timer unit on exit.
    pub elapsed: Option<Duration>,
    /// Declared body size for body-carrying methods.
    pub body_size: Option<u64>,
    pub auth_scheme: Option<String>,
    /// Kind of the downstream fault, when the downstream returned `Err`.
    pub fault: Option<ErrorKind>,
    tracked: bool,
}

impl RequestContext {
    pub fn from_request(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            route: None,
            status: None,
            elapsed: None,
            body_size: None,
            auth_scheme: None,
            fault: None,
            tracked: true,
        }
    }

    /// False when the path is on the ignored-routes list; tracking units pass through.
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    pub(crate) fn set_tracked(&mut self, tracked: bool) {
        self.tracked = tracked;
    }

    /// Route template when the application reported one, raw path otherwise.
    pub fn route_or_path(&self) -> &str {
        self.route.as_deref().unwrap_or(&self.path)
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status.map(|s| s.as_u16())
    }

    /// Pull post-downstream facts out of the downstream's result.
    pub(crate) fn absorb(&mut self, res: &Result<Response>) {
        match res {
            Ok(resp) => {
                self.status = Some(resp.status());
                if let Some(RouteTemplate(t)) = resp.extensions().get::<RouteTemplate>() {
                    self.route = Some(t.clone());
                }
                if let Some(AuthScheme(s)) = resp.extensions().get::<AuthScheme>() {
                    self.auth_scheme = Some(s.clone());
                }
            }
            Err(e) => self.fault = Some(e.kind()),
        }
    }
}

/// Methods that carry a request body.
pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Declared `Content-Length`, 0 when absent or unparseable.
pub fn declared_content_length(req: &Request) -> u64 {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use axum::body::Body;
    use webmeter_core::WebMeterError;

    fn request(method: Method, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn falls_back_to_raw_path_without_template() {
        let ctx = RequestContext::from_request(&request(Method::GET, "/items/7?x=1"));
        assert_eq!(ctx.route_or_path(), "/items/7");
    }

    #[test]
    fn absorbs_route_auth_and_status_from_response() {
        let mut ctx = RequestContext::from_request(&request(Method::GET, "/items/7"));
        let mut resp = Response::new(Body::empty());
        *resp.status_mut() = StatusCode::CREATED;
        resp.extensions_mut().insert(RouteTemplate("/items/:id".into()));
        resp.extensions_mut().insert(AuthScheme("bearer".into()));

        ctx.absorb(&Ok(resp));
        assert_eq!(ctx.route_or_path(), "/items/:id");
        assert_eq!(ctx.auth_scheme.as_deref(), Some("bearer"));
        assert_eq!(ctx.status_code(), Some(201));
    }

    #[test]
    fn absorbs_fault_kind() {
        let mut ctx = RequestContext::from_request(&request(Method::GET, "/"));
        ctx.absorb(&Err(WebMeterError::Downstream("boom".into())));
        assert_eq!(ctx.fault, Some(ErrorKind::Downstream));
        assert!(ctx.status.is_none());
    }

    #[test]
    fn content_length_defaults_to_zero() {
        let req = Request::builder()
            .method(Method::PUT)
            .uri("/")
            .header(header::CONTENT_LENGTH, "nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(declared_content_length(&req), 0);
        assert!(carries_body(req.method()));
        assert!(!carries_body(&Method::GET));
    }
}
