//! Axum wiring.
//!
//! `instrument` wraps an application router with the composed chain. Matched route templates
//! are captured per route and handed back to the chain through `RouteTemplate` on the response.

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;

use webmeter_core::error::{ErrorKind, WebMeterError};

use crate::pipeline::{Chain, RouteTemplate};

/// Attach `chain` around every route (and the fallback) of `router`.
///
/// Routes must be registered before calling this; the template capture is a `route_layer`.
pub fn instrument<S>(router: Router<S>, chain: Chain) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .route_layer(middleware::from_fn(capture_route))
        .layer(middleware::from_fn_with_state(chain, run_chain))
}

/// Copy the matched route template onto the response unless the handler set one.
async fn capture_route(matched: Option<MatchedPath>, req: Request, next: Next) -> Response {
    let template = matched.map(|m| m.as_str().to_string());
    let mut res = next.run(req).await;
    if let Some(t) = template {
        if res.extensions().get::<RouteTemplate>().is_none() {
            res.extensions_mut().insert(RouteTemplate(t));
        }
    }
    res
}

async fn run_chain(State(chain): State<Chain>, req: Request, next: Next) -> Response {
    match chain.handle(req, next).await {
        Ok(res) => res,
        Err(e) => FaultResponse(e).into_response(),
    }
}

/// JSON error body for a fault that escaped the chain.
pub struct FaultResponse(pub WebMeterError);

impl IntoResponse for FaultResponse {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(error = %self.0, status = status.as_u16(), "request fault");
        let body = json!({ "error": self.0.kind().as_str(), "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}
