//! Logging interceptor, per §4.8.2 item 5: one structured record per call
//! — info on success with method and duration, error on failure with the
//! wire code and message.

use std::time::Instant;

use tonic::{Request, Response, Status};

use crate::interceptor::{BoxFuture, Next, RpcContext, RpcInterceptor};
use crate::status::code_label;

pub struct LoggingInterceptor;

impl<Req, Res> RpcInterceptor<Req, Res> for LoggingInterceptor
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
        let method = ctx.method;
        Box::pin(async move {
            let start = Instant::now();
            let result = next(req).await;
            let duration_ms = start.elapsed().as_millis();
            match &result {
                Ok(_) => {
                    tracing::info!(method, duration_ms, "rpc completed");
                }
                Err(status) => {
                    tracing::error!(
                        method,
                        duration_ms,
                        code = code_label(status.code()),
                        message = %status.message(),
                        "rpc failed"
                    );
                }
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorChain;
    use std::sync::Arc;

    #[tokio::test]
    async fn a_successful_call_passes_through_unaltered() {
        let chain: InterceptorChain<String, String> = InterceptorChain::new(vec![Arc::new(LoggingInterceptor)]);
        let ctx = RpcContext { method: "Solve" };
        let result = chain
            .run(ctx, Request::new("hi".to_string()), |req| async move { Ok(Response::new(req.into_inner())) })
            .await
            .unwrap();
        assert_eq!(result.into_inner(), "hi");
    }

    #[tokio::test]
    async fn a_failing_call_still_propagates_the_status() {
        let chain: InterceptorChain<String, String> = InterceptorChain::new(vec![Arc::new(LoggingInterceptor)]);
        let ctx = RpcContext { method: "Solve" };
        let result: Result<Response<String>, Status> = chain
            .run(ctx, Request::new("hi".to_string()), |_req| async move { Err(Status::not_found("no such graph")) })
            .await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::NotFound);
    }
}
