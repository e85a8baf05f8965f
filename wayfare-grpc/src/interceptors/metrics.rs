//! Metrics interceptor, per §4.8.2 item 4: in-flight gauge, latency timer,
//! and final-status counters/histograms.

use std::time::Instant;

use tonic::{Request, Response, Status};

use crate::interceptor::{BoxFuture, Next, RpcContext, RpcInterceptor};
use crate::status::code_label;

pub struct MetricsInterceptor;

impl<Req, Res> RpcInterceptor<Req, Res> for MetricsInterceptor
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
            wayfare_metrics::start_in_flight(method);
            let start = Instant::now();
            let result = next(req).await;
            wayfare_metrics::end_in_flight(method);

            let status_label = match &result {
                Ok(_) => code_label(tonic::Code::Ok),
                Err(status) => code_label(status.code()),
            };
            wayfare_metrics::record_rpc(method, status_label, start.elapsed().as_secs_f64());

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorChain;
    use std::sync::Arc;
    use std::sync::Once;
    use wayfare_metrics::{init_metrics, MetricsConfig};

    static INIT: Once = Once::new();

    fn ensure_metrics() {
        INIT.call_once(|| {
            init_metrics(&MetricsConfig::default());
        });
    }

    #[tokio::test]
    async fn records_rpc_outcome_without_altering_the_result() {
        ensure_metrics();
        let chain: InterceptorChain<String, String> = InterceptorChain::new(vec![Arc::new(MetricsInterceptor)]);
        let ctx = RpcContext { method: "Solve" };
        let result = chain
            .run(ctx, Request::new("hi".to_string()), |req| async move { Ok(Response::new(req.into_inner())) })
            .await
            .unwrap();
        assert_eq!(result.into_inner(), "hi");
        assert_eq!(wayfare_metrics::in_flight_for_method("Solve"), 0);
    }

    #[tokio::test]
    async fn in_flight_gauge_is_cleared_even_on_error() {
        ensure_metrics();
        let chain: InterceptorChain<String, String> = InterceptorChain::new(vec![Arc::new(MetricsInterceptor)]);
        let ctx = RpcContext { method: "Fails" };
        let result: Result<Response<String>, Status> = chain
            .run(ctx, Request::new("hi".to_string()), |_req| async move {
                Err(Status::internal("boom"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(wayfare_metrics::in_flight_for_method("Fails"), 0);
    }
}
