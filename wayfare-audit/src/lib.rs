//! Bounded, back-pressure-aware audit entry pipeline.
//!
//! Producers call [`AuditPipeline::log`] to record an [`AuditEntry`]; a
//! background worker batches entries and flushes them to a configured
//! [`AuditSink`] (console, rotating file, or a remote RPC batch endpoint).

pub mod entry;
pub mod pipeline;
pub mod sink;
pub mod sinks;

pub use entry::{
    classify_action, AuditAction, AuditChanges, AuditEntry, AuditEntryBuilder, AuditIdentity, AuditOutcome, AuditResource,
};
pub use pipeline::{AuditPipeline, AuditPipelineConfig};
pub use sink::{AuditFilter, AuditSink};
pub use sinks::{AuditRpcTransport, ConsoleSink, FileSink, LogEventBatchResult, RemoteSink};
