//! Validation interceptor, per §4.8.2 item 6: if the request exposes a
//! `validate()` capability, invokes it and surfaces any error as
//! `INVALID_ARGUMENT`.
//!
//! Rust has no runtime "does this type implement a method" check, so the
//! capability is expressed the way the rest of the chain expresses
//! backend variation (§9: "tagged variants or interface abstractions both
//! suffice; static dispatch is acceptable because the set is closed at
//! compile time") — a request type opts in by implementing [`GrpcValidate`];
//! services whose request types don't implement it simply omit this
//! interceptor from their chain.

use tonic::{Request, Response, Status};
use wayfare_core::ValidationErrors;

use crate::interceptor::{BoxFuture, Next, RpcContext, RpcInterceptor};

/// Capability a request type implements to participate in validation.
pub trait GrpcValidate {
    fn validate(&self) -> ValidationErrors;
}

pub struct ValidationInterceptor;

impl<Req, Res> RpcInterceptor<Req, Res> for ValidationInterceptor
where
    Req: GrpcValidate + Send + 'static,
    Res: Send + 'static,
{
    fn around(
        &self,
        _ctx: RpcContext,
        req: Request<Req>,
        next: Next<Req, Res>,
    ) -> BoxFuture<'static, Result<Response<Res>, Status>> {
        let errors = req.get_ref().validate();
        if errors.is_valid() {
            return next(req);
        }
        let message = errors
            .errors()
            .iter()
            .map(|e| e.message().to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Box::pin(std::future::ready(Err(Status::invalid_argument(message))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorChain;
    use std::sync::Arc;
    use wayfare_core::{CoreError, ErrorCode};

    #[derive(Clone)]
    struct SolveRequest {
        source_id: String,
    }

    impl GrpcValidate for SolveRequest {
        fn validate(&self) -> ValidationErrors {
            let mut errors = ValidationErrors::new();
            if self.source_id.is_empty() {
                errors.push_error(
                    CoreError::new(ErrorCode::InvalidSource, "source_id is required").with_field("source_id"),
                );
            }
            errors
        }
    }

    #[tokio::test]
    async fn a_valid_request_reaches_the_handler() {
        let chain: InterceptorChain<SolveRequest, String> =
            InterceptorChain::new(vec![Arc::new(ValidationInterceptor)]);
        let ctx = RpcContext { method: "Solve" };
        let req = Request::new(SolveRequest { source_id: "s".into() });
        let result = chain.run(ctx, req, |_req| async move { Ok(Response::new("ok".to_string())) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn an_invalid_request_is_rejected_before_the_handler() {
        let chain: InterceptorChain<SolveRequest, String> =
            InterceptorChain::new(vec![Arc::new(ValidationInterceptor)]);
        let ctx = RpcContext { method: "Solve" };
        let req = Request::new(SolveRequest { source_id: String::new() });
        let result = chain.run(ctx, req, |_req| async move { Ok(Response::new("ok".to_string())) }).await;
        let status = result.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert!(status.message().contains("source_id"));
    }
}
