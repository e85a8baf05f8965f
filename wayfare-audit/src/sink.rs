use std::future::Future;
use std::pin::Pin;

use wayfare_core::{CoreError, ErrorCode};

use crate::entry::AuditEntry;

/// Filter passed to [`AuditSink::query`]. All fields are conjunctive (AND).
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor: Option<String>,
    pub resource: Option<String>,
    pub method: Option<String>,
    pub limit: Option<usize>,
}

/// Common interface shared by every audit sink.
///
/// `query` is only meaningfully implemented by sinks backed by a queryable
/// store (a remote audit service); the console and file sinks return a
/// uniform "not supported" error rather than an empty page, so callers can
/// distinguish "no matches" from "this sink can't be queried" by matching
/// on the error instead of silently getting zero rows.
pub trait AuditSink: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Write a batch of entries. Called by the pipeline's worker loop on
    /// every flush; implementations should treat partial failure (some
    /// entries written, some not) as a logged warning, never a propagated
    /// error that could reach a producer.
    fn write_batch(&self, entries: &[AuditEntry]) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn query(&self, filter: &AuditFilter) -> impl Future<Output = Result<Vec<AuditEntry>, CoreError>> + Send {
        let _ = filter;
        std::future::ready(Err(not_supported(self.name())))
    }

    /// Release any held resources (open files, connections). Called once
    /// during pipeline shutdown after the final flush.
    fn close(&self) -> impl Future<Output = Result<(), CoreError>> + Send {
        std::future::ready(Ok(()))
    }
}

pub(crate) fn not_supported(sink_name: &str) -> CoreError {
    CoreError::new(ErrorCode::Internal, format!("query not supported by the {sink_name} sink"))
}

/// Object-safe wrapper for [`AuditSink`], mirroring
/// `wayfare_core::health::HealthIndicatorErased`.
pub(crate) trait AuditSinkErased: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn write_batch<'a>(&'a self, entries: &'a [AuditEntry]) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'a>>;
    fn query<'a>(&'a self, filter: &'a AuditFilter) -> Pin<Box<dyn Future<Output = Result<Vec<AuditEntry>, CoreError>> + Send + 'a>>;
    fn close<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'a>>;
}

impl<T: AuditSink> AuditSinkErased for T {
    fn name(&self) -> &str {
        AuditSink::name(self)
    }

    fn write_batch<'a>(&'a self, entries: &'a [AuditEntry]) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'a>> {
        Box::pin(AuditSink::write_batch(self, entries))
    }

    fn query<'a>(&'a self, filter: &'a AuditFilter) -> Pin<Box<dyn Future<Output = Result<Vec<AuditEntry>, CoreError>> + Send + 'a>> {
        Box::pin(AuditSink::query(self, filter))
    }

    fn close<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'a>> {
        Box::pin(AuditSink::close(self))
    }
}
