//! Outermost interceptor, per §4.8.2 item 1: catches any uncaught
//! termination from downstream and turns it into a wire `INTERNAL` error
//! instead of tearing down the connection.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tonic::{Request, Response, Status};

use crate::interceptor::{BoxFuture, Next, RpcContext, RpcInterceptor};

pub struct RecoveryInterceptor;

impl<Req, Res> RpcInterceptor<Req, Res> for RecoveryInterceptor
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
            match AssertUnwindSafe(next(req)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(&panic);
                    tracing::error!(method, panic = %message, "panic caught by recovery interceptor");
                    Err(Status::internal(format!("internal error in {method}")))
                }
            }
        })
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorChain;
    use std::sync::Arc;

    #[tokio::test]
    async fn a_panicking_handler_is_converted_to_an_internal_status() {
        let chain: InterceptorChain<String, String> =
            InterceptorChain::new(vec![Arc::new(RecoveryInterceptor)]);
        let ctx = RpcContext { method: "test" };
        let result = chain
            .run(ctx, Request::new("hi".to_string()), |_req| async move {
                panic!("boom");
                #[allow(unreachable_code)]
                Ok(Response::new(String::new()))
            })
            .await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::Internal);
    }

    #[tokio::test]
    async fn a_well_behaved_handler_passes_through_unaffected() {
        let chain: InterceptorChain<String, String> =
            InterceptorChain::new(vec![Arc::new(RecoveryInterceptor)]);
        let ctx = RpcContext { method: "test" };
        let result = chain
            .run(ctx, Request::new("hi".to_string()), |req| async move { Ok(Response::new(req.into_inner())) })
            .await
            .unwrap();
        assert_eq!(result.into_inner(), "hi");
    }
}
