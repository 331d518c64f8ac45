//! Instrumentation chain.
//!
//! A `Chain` is an ordered list of `Middleware` units composed once at startup. Each unit gets
//! the request, the per-request `RequestContext`, and a `Next` it may call to delegate to the
//! rest of the chain. The last `Next` hands the request to a `Downstream`: the real application
//! handler.
//!
//! Exit-side bookkeeping that must survive faults uses drop guards inside the units, so a
//! downstream `Err`, a panic, or the request future being dropped all release correctly.

pub mod composer;
pub mod context;
pub mod units;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;

use webmeter_core::error::Result;

use crate::config::MetricsOptions;

pub use composer::compose;
pub use context::{AuthScheme, RequestContext, RouteTemplate};

/// One unit of the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle(&self, ctx: &mut RequestContext, req: Request, next: Next<'_>) -> Result<Response>;
}

/// The application handler at the end of the chain. Consumed by the call.
#[async_trait]
pub trait Downstream: Send {
    async fn call(self: Box<Self>, req: Request) -> Result<Response>;
}

/// Remaining units plus the downstream.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    downstream: Box<dyn Downstream + 'a>,
}

impl<'a> Next<'a> {
    pub async fn run(self, ctx: &mut RequestContext, req: Request) -> Result<Response> {
        let Next { rest, downstream } = self;
        match rest.split_first() {
            Some((unit, rest)) => unit.handle(ctx, req, Next { rest, downstream }).await,
            None => {
                let res = downstream.call(req).await;
                ctx.absorb(&res);
                res
            }
        }
    }
}

/// Closure-backed downstream.
pub struct FnDownstream<F>(F);

/// Wrap an async closure as the chain's downstream.
pub fn downstream_fn<F, Fut>(f: F) -> FnDownstream<F>
where
    F: FnOnce(Request) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    FnDownstream(f)
}

#[async_trait]
impl<F, Fut> Downstream for FnDownstream<F>
where
    F: FnOnce(Request) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    async fn call(self: Box<Self>, req: Request) -> Result<Response> {
        (self.0)(req).await
    }
}

#[async_trait]
impl Downstream for axum::middleware::Next {
    async fn call(self: Box<Self>, req: Request) -> Result<Response> {
        Ok((*self).run(req).await)
    }
}

/// Composed, immutable instrumentation chain. Cheap to clone.
#[derive(Clone)]
pub struct Chain {
    units: Arc<[Arc<dyn Middleware>]>,
    options: Option<Arc<MetricsOptions>>,
}

impl Chain {
    pub fn new(units: Vec<Arc<dyn Middleware>>) -> Self {
        Self { units: units.into(), options: None }
    }

    /// Apply ignored-route filtering from `options`.
    pub fn with_options(mut self, options: Arc<MetricsOptions>) -> Self {
        self.options = Some(options);
        self
    }

    /// Unit names, outermost first.
    pub fn unit_names(&self) -> Vec<&'static str> {
        self.units.iter().map(|u| u.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Run `req` through every unit and finally `downstream`.
    pub async fn handle<D>(&self, req: Request, downstream: D) -> Result<Response>
    where
        D: Downstream + 'static,
    {
        let mut ctx = RequestContext::from_request(&req);
        if let Some(opts) = &self.options {
            ctx.set_tracked(!opts.is_ignored_route(&ctx.path));
        }
        let next = Next { rest: &self.units, downstream: Box::new(downstream) };
        next.run(&mut ctx, req).await
    }
}
