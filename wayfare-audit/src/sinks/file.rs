//! Sink that writes one JSON line per entry to a rotating file.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use wayfare_core::{CoreError, ErrorCode};

use crate::entry::AuditEntry;
use crate::sink::AuditSink;

/// Buffered writer over a daily-rotating file. The pipeline's own flush
/// cadence (batch size or tick period, whichever trips first) stands in
/// for a dedicated flush timer: every `write_batch` call ends by flushing
/// the writer, so entries are never left sitting in the OS buffer any
/// longer than one flush interval.
pub struct FileSink {
    writer: Mutex<RollingFileAppender>,
}

impl FileSink {
    pub fn new(directory: impl AsRef<Path>, file_name_prefix: impl AsRef<str>) -> Self {
        let appender = tracing_appender::rolling::daily(directory, file_name_prefix.as_ref());
        Self { writer: Mutex::new(appender) }
    }
}

impl AuditSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn write_batch(&self, entries: &[AuditEntry]) -> Result<(), CoreError> {
        let mut writer = self.writer.lock().expect("file sink mutex poisoned");
        for entry in entries {
            let line = serde_json::to_string(entry)
                .map_err(|err| CoreError::new(ErrorCode::Internal, format!("failed to serialize audit entry: {err}")))?;
            writeln!(writer, "{line}").map_err(|err| CoreError::new(ErrorCode::Internal, format!("failed to write audit entry to file: {err}")))?;
        }
        writer.flush().map_err(|err| CoreError::new(ErrorCode::Internal, format!("failed to flush audit log file: {err}")))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), CoreError> {
        let mut writer = self.writer.lock().expect("file sink mutex poisoned");
        writer.flush().map_err(|err| CoreError::new(ErrorCode::Internal, format!("failed to flush audit log file on close: {err}")))
    }
}
