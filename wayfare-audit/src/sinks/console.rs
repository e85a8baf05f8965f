//! Sink that writes each entry as a JSON line to standard output.

use std::io::Write;
use std::sync::Mutex;

use wayfare_core::{CoreError, ErrorCode};

use crate::entry::AuditEntry;
use crate::sink::AuditSink;

/// Writes one JSON line per entry to stdout under a mutex. No batching
/// beyond whatever the pipeline's worker loop already accumulated.
pub struct ConsoleSink {
    stdout: Mutex<std::io::Stdout>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self { stdout: Mutex::new(std::io::stdout()) }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn write_batch(&self, entries: &[AuditEntry]) -> Result<(), CoreError> {
        let mut out = self.stdout.lock().expect("console sink mutex poisoned");
        for entry in entries {
            let line = serde_json::to_string(entry)
                .map_err(|err| CoreError::new(ErrorCode::Internal, format!("failed to serialize audit entry: {err}")))?;
            writeln!(out, "{line}").map_err(|err| CoreError::new(ErrorCode::Internal, format!("failed to write audit entry to stdout: {err}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AuditEntryBuilder;

    #[tokio::test]
    async fn write_batch_succeeds_for_an_empty_batch() {
        let sink = ConsoleSink::new();
        sink.write_batch(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn write_batch_writes_every_entry() {
        let sink = ConsoleSink::new();
        let entries = vec![AuditEntryBuilder::new("MaxFlow").build(), AuditEntryBuilder::new("MinCut").build()];
        sink.write_batch(&entries).await.unwrap();
    }

    #[tokio::test]
    async fn query_is_not_supported() {
        let sink = ConsoleSink::new();
        let err = sink.query(&Default::default()).await.unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }
}
