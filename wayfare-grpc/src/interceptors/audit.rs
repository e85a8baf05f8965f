//! Audit interceptor, per §4.8.2 item 7: classifies the method into an
//! action, extracts caller identity and resource from request metadata,
//! and dispatches an [`AuditEntry`] to the pipeline without delaying the
//! RPC return.

use std::sync::Arc;
use std::time::Instant;

use tonic::{Request, Response, Status};
use wayfare_audit::{classify_action, AuditEntryBuilder, AuditOutcome, AuditPipeline};

use crate::interceptor::{BoxFuture, Next, RpcContext, RpcInterceptor};
use crate::metadata::extract_identity;
use crate::status::code_label;

pub struct AuditInterceptor {
    pipeline: Arc<AuditPipeline>,
    service: String,
}

impl AuditInterceptor {
    pub fn new(pipeline: Arc<AuditPipeline>, service: impl Into<String>) -> Self {
        Self { pipeline, service: service.into() }
    }
}

impl<Req, Res> RpcInterceptor<Req, Res> for AuditInterceptor
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
        let identity = extract_identity(&req);
        let pipeline = self.pipeline.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let start = Instant::now();
            let result = next(req).await;
            let duration = start.elapsed();

            let mut builder = AuditEntryBuilder::new(method).service(service).action(classify_action(method)).duration(duration);

            if let Some(request_id) = &identity.request_id {
                builder = builder.request_id(request_id.clone());
            }
            if let Some(user_id) = &identity.user_id {
                builder = builder.user_id(user_id.clone());
            }
            if let Some(username) = &identity.username {
                builder = builder.username(username.clone());
            }
            if let Some(client_ip) = &identity.client_ip {
                builder = builder.client_ip(client_ip.clone());
            }

            builder = match &result {
                Ok(_) => builder.outcome(AuditOutcome::Success),
                Err(status) if status.code() == tonic::Code::ResourceExhausted || status.code() == tonic::Code::PermissionDenied => {
                    builder.error(code_label(status.code()), status.message()).outcome(AuditOutcome::Denied)
                }
                Err(status) => builder.error(code_label(status.code()), status.message()),
            };

            pipeline.log(builder.build()).await;

            result
        })
    }
}
