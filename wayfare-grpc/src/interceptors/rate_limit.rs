//! Rate-limit interceptor, per §4.8.2 item 2: extracts the bucket key from
//! request metadata and the peer address, then denies or forwards.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use wayfare_rate_limit::RateLimiter;

use crate::interceptor::{BoxFuture, Next, RpcContext, RpcInterceptor};
use crate::interceptors::exclusion::ExclusionSet;
use crate::metadata::request_meta;

pub struct RateLimitInterceptor {
    limiter: RateLimiter,
    exclusions: ExclusionSet,
}

impl RateLimitInterceptor {
    pub fn new(limiter: RateLimiter, exclusions: ExclusionSet) -> Self {
        Self { limiter, exclusions }
    }
}

impl<Req, Res> RpcInterceptor<Req, Res> for RateLimitInterceptor
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
        if self.exclusions.contains(ctx.method) {
            return next(req);
        }

        let meta = request_meta(ctx.method, &req);
        let key = self.limiter.extract_key(&meta);
        let limiter = self.limiter.clone();

        Box::pin(async move {
            match limiter.check(&key).await {
                Ok(()) => next(req).await,
                Err(denied) => {
                    let mut status = Status::resource_exhausted(denied.to_string());
                    for (name, value) in denied.info.headers() {
                        let key = tonic::metadata::MetadataKey::from_bytes(name.as_bytes());
                        let value = tonic::metadata::MetadataValue::try_from(value.as_str());
                        if let (Ok(key), Ok(value)) = (key, value) {
                            status.metadata_mut().insert(key, value);
                        }
                    }
                    Err(status)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorChain;
    use std::time::Duration;
    use wayfare_rate_limit::backend::memory::InMemoryBackend;
    use wayfare_rate_limit::{RateLimiterConfig, Strategy};

    fn chain(requests: u64) -> InterceptorChain<String, String> {
        let limiter = RateLimiter::new(
            InMemoryBackend::new(),
            RateLimiterConfig { strategy: Strategy::SlidingWindow, requests, window: Duration::from_secs(60), burst: 0 },
        );
        InterceptorChain::new(vec![Arc::new(RateLimitInterceptor::new(limiter, ExclusionSet::default()))])
    }

    async fn run(chain: &InterceptorChain<String, String>, method: &'static str) -> Result<Response<String>, Status> {
        let ctx = RpcContext { method };
        chain.run(ctx, Request::new("hi".to_string()), |req| async move { Ok(Response::new(req.into_inner())) }).await
    }

    #[tokio::test]
    async fn admits_calls_within_limit() {
        let chain = chain(2);
        assert!(run(&chain, "wayfare.RoutingService/Solve").await.is_ok());
        assert!(run(&chain, "wayfare.RoutingService/Solve").await.is_ok());
    }

    #[tokio::test]
    async fn denies_over_limit_with_resource_exhausted() {
        let chain = chain(1);
        assert!(run(&chain, "wayfare.RoutingService/Solve").await.is_ok());
        let result = run(&chain, "wayfare.RoutingService/Solve").await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::ResourceExhausted);
    }

    #[tokio::test]
    async fn excluded_methods_bypass_the_limiter() {
        let limiter = RateLimiter::new(
            InMemoryBackend::new(),
            RateLimiterConfig { strategy: Strategy::SlidingWindow, requests: 1, window: Duration::from_secs(60), burst: 0 },
        );
        let chain: InterceptorChain<String, String> = InterceptorChain::new(vec![Arc::new(RateLimitInterceptor::new(
            limiter,
            ExclusionSet::new(vec!["wayfare.RoutingService/Solve"]),
        ))]);
        for _ in 0..5 {
            assert!(run(&chain, "wayfare.RoutingService/Solve").await.is_ok());
        }
    }
}
