//! Sink that batches entries into a single `logEventBatch` RPC.

use wayfare_core::CoreError;

use crate::entry::AuditEntry;
use crate::sink::AuditSink;

/// Outcome of a `logEventBatch` call. `failed_count` lets the sink log a
/// partial-success warning instead of treating the whole batch as lost.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventBatchResult {
    pub accepted_count: usize,
    pub failed_count: usize,
}

/// Transport used by [`RemoteSink`] to actually deliver a batch.
///
/// Kept as a trait here rather than depending on a concrete gRPC client so
/// that `wayfare-audit` has no dependency on `wayfare-grpc` — the service
/// runtime wires a real tonic-backed implementation in at startup.
pub trait AuditRpcTransport: Send + Sync + 'static {
    fn log_event_batch(&self, entries: &[AuditEntry]) -> impl std::future::Future<Output = Result<LogEventBatchResult, CoreError>> + Send;
}

/// Batches entries and hands them to an [`AuditRpcTransport`]. Batching
/// itself (by size or by time) is the pipeline's job; this sink only
/// issues one RPC per flush and never propagates RPC failure to the
/// caller — forward progress matters more than delivery guarantees here.
pub struct RemoteSink<T> {
    transport: T,
}

impl<T> RemoteSink<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: AuditRpcTransport> AuditSink for RemoteSink<T> {
    fn name(&self) -> &str {
        "remote"
    }

    async fn write_batch(&self, entries: &[AuditEntry]) -> Result<(), CoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        match self.transport.log_event_batch(entries).await {
            Ok(result) if result.failed_count > 0 => {
                tracing::warn!(
                    accepted = result.accepted_count,
                    failed = result.failed_count,
                    "logEventBatch reported partial success"
                );
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, batch_size = entries.len(), "logEventBatch failed; batch abandoned");
                Ok(())
            }
        }
    }
}
