//! The interceptor chain, per §4.8. Generalizes the framework's
//! `Interceptor<R, S>::around(ctx, next)` shape into an object-safe,
//! `'static`-only form: every captured value (state `Arc`s, the owned
//! request) is already owned, so boxed closures cost nothing extra over a
//! borrowed-lifetime design while staying trivially composable in a `Vec`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tonic::{Request, Response, Status};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The continuation an interceptor invokes to hand control to the rest of
/// the chain (or, for the innermost wrapper, the handler itself).
pub type Next<Req, Res> = Box<dyn FnOnce(Request<Req>) -> BoxFuture<'static, Result<Response<Res>, Status>> + Send>;

/// Read-only call metadata threaded alongside the request through the
/// chain — the RPC's fully-qualified method name, used for metrics,
/// logging, and audit classification.
#[derive(Debug, Clone, Copy)]
pub struct RpcContext {
    pub method: &'static str,
}

/// One link in the chain. `around` receives the request, a context, and
/// the continuation representing everything downstream; it decides
/// whether to call `next`, short-circuit with a `Status`, or wrap the
/// result on the way back out.
pub trait RpcInterceptor<Req, Res>: Send + Sync
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn around(
        &self,
        ctx: RpcContext,
        req: Request<Req>,
        next: Next<Req, Res>,
    ) -> BoxFuture<'static, Result<Response<Res>, Status>>;
}

/// An ordered, immutable list of interceptors wrapping a handler.
///
/// Composition matches §4.8.1: with interceptors `[i1, i2, ..., iN]` and
/// handler `h`, invocation order is `i1(ctx, req, info, λ1)` where
/// `λ1 = i2(ctx, req, info, λ2)` and so on until `λN = h` — built here by
/// folding the list from the end so the first interceptor ends up
/// outermost.
#[derive(Clone)]
pub struct InterceptorChain<Req, Res> {
    interceptors: Arc<Vec<Arc<dyn RpcInterceptor<Req, Res>>>>,
}

impl<Req, Res> InterceptorChain<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    pub fn new(interceptors: Vec<Arc<dyn RpcInterceptor<Req, Res>>>) -> Self {
        Self { interceptors: Arc::new(interceptors) }
    }

    /// Runs `req` through the chain and into `handler`.
    pub async fn run<H, Fut>(
        &self,
        ctx: RpcContext,
        req: Request<Req>,
        handler: H,
    ) -> Result<Response<Res>, Status>
    where
        H: FnOnce(Request<Req>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Response<Res>, Status>> + Send + 'static,
    {
        let mut next: Next<Req, Res> = Box::new(move |req| Box::pin(handler(req)));

        for interceptor in self.interceptors.iter().rev().cloned() {
            let inner_next = next;
            next = Box::new(move |req| interceptor.around(ctx, req, inner_next));
        }

        next(req).await
    }
}
