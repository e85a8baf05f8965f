//! Tracing interceptor, per §4.8.2 item 3: starts a span named after the
//! RPC method and instruments the downstream future with it.

use tonic::{Request, Response, Status};
use tracing::Instrument;

use crate::interceptor::{BoxFuture, Next, RpcContext, RpcInterceptor};

pub struct TracingInterceptor;

impl<Req, Res> RpcInterceptor<Req, Res> for TracingInterceptor
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn around(
        &self,
        ctx: RpcContext,
        req: Request<Req>,
        next: Next<Req, Res>,
    ) -> BoxFuture<'static, Result<Response<Res>, Status>> {
        let span = tracing::info_span!("rpc", method = ctx.method);
        Box::pin(next(req).instrument(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorChain;
    use std::sync::Arc;

    #[tokio::test]
    async fn wraps_the_call_without_altering_the_result() {
        let chain: InterceptorChain<String, String> = InterceptorChain::new(vec![Arc::new(TracingInterceptor)]);
        let ctx = RpcContext { method: "Solve" };
        let result = chain
            .run(ctx, Request::new("hi".to_string()), |req| async move { Ok(Response::new(req.into_inner())) })
            .await
            .unwrap();
        assert_eq!(result.into_inner(), "hi");
    }
}
