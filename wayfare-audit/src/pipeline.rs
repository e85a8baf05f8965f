//! Bounded, back-pressure-aware audit entry pipeline.
//!
//! A producer calls [`AuditPipeline::log`], which enqueues onto a bounded
//! channel read by a single background worker. The worker batches entries
//! and flushes them to the configured [`AuditSink`] either when the batch
//! fills or when a flush tick elapses.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wayfare_core::config::sections::AuditSection;
use wayfare_core::CoreError;

use crate::entry::AuditEntry;
use crate::sink::{AuditFilter, AuditSink, AuditSinkErased};

const DEFAULT_BATCH_SIZE: usize = 64;

/// Tuning knobs for [`AuditPipeline`], independent of which sink is used.
#[derive(Debug, Clone)]
pub struct AuditPipelineConfig {
    /// Capacity of the producer-to-worker channel.
    pub queue_capacity: usize,
    /// Entries accumulated before a flush is triggered early.
    pub batch_size: usize,
    /// Upper bound on how long entries sit unflushed.
    pub flush_period: Duration,
}

impl Default for AuditPipelineConfig {
    fn default() -> Self {
        Self { queue_capacity: 1024, batch_size: DEFAULT_BATCH_SIZE, flush_period: Duration::from_secs(5) }
    }
}

impl From<&AuditSection> for AuditPipelineConfig {
    fn from(section: &AuditSection) -> Self {
        Self {
            queue_capacity: section.buffer_size,
            batch_size: DEFAULT_BATCH_SIZE.min(section.buffer_size.max(1)),
            flush_period: Duration::from_secs(section.flush_period_secs),
        }
    }
}

/// Entry point producers use to record audit entries.
///
/// Cloning is cheap: the sender and a shared handle to the sink are both
/// reference-counted, so every clone enqueues onto the same worker.
#[derive(Clone)]
pub struct AuditPipeline {
    sender: mpsc::Sender<AuditEntry>,
    sink: Arc<dyn AuditSinkErased>,
    shutdown: CancellationToken,
    worker: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl AuditPipeline {
    pub fn new<S: AuditSink>(config: AuditPipelineConfig, sink: S) -> Self {
        Self::from_erased(config, Arc::new(sink))
    }

    fn from_erased(config: AuditPipelineConfig, sink: Arc<dyn AuditSinkErased>) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(worker_loop(receiver, sink.clone(), config.batch_size.max(1), config.flush_period, shutdown.clone()));
        Self { sender, sink, shutdown, worker: Arc::new(std::sync::Mutex::new(Some(worker))) }
    }

    /// Enqueues `entry`. Returns immediately if the queue has room.
    ///
    /// If the queue is full, falls back to a direct, synchronous write
    /// through the sink. If that also fails (or the pipeline is already
    /// shut down), the entry is dropped and a warning is logged — a
    /// producer is never blocked waiting for audit delivery.
    pub async fn log(&self, entry: AuditEntry) {
        match self.sender.try_send(entry) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(entry)) => {
                let method = entry.method.clone();
                if let Err(err) = self.sink.write_batch(std::slice::from_ref(&entry)).await {
                    tracing::warn!(method = %method, error = %err, "audit queue full and fallback write failed; entry dropped");
                }
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                tracing::warn!(method = %entry.method, "audit pipeline is closed; entry dropped");
            }
        }
    }

    /// Delegates to the configured sink. Sinks that can't be queried
    /// (console, file) return a uniform "not supported" error.
    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, CoreError> {
        self.sink.query(filter).await
    }

    /// Drains the queue, waits for the worker's final flush, then closes
    /// the sink. Bounded: once the channel is closed and the worker exits,
    /// this returns.
    pub async fn close(&self) -> Result<(), CoreError> {
        self.shutdown.cancel();
        let handle = self.worker.lock().expect("audit pipeline worker mutex poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.sink.close().await
    }
}

async fn worker_loop(
    mut receiver: mpsc::Receiver<AuditEntry>,
    sink: Arc<dyn AuditSinkErased>,
    batch_size: usize,
    flush_period: Duration,
    shutdown: CancellationToken,
) {
    let mut batch: Vec<AuditEntry> = Vec::with_capacity(batch_size);
    let mut ticker = tokio::time::interval(flush_period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                flush(&sink, &mut batch).await;
                break;
            }
            maybe_entry = receiver.recv() => {
                match maybe_entry {
                    Some(entry) => {
                        batch.push(entry);
                        if batch.len() >= batch_size {
                            flush(&sink, &mut batch).await;
                        }
                    }
                    None => {
                        flush(&sink, &mut batch).await;
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                flush(&sink, &mut batch).await;
            }
        }
    }
}

async fn flush(sink: &Arc<dyn AuditSinkErased>, batch: &mut Vec<AuditEntry>) {
    if batch.is_empty() {
        return;
    }
    if let Err(err) = sink.write_batch(batch).await {
        tracing::warn!(sink = sink.name(), batch_size = batch.len(), error = %err, "audit batch flush failed");
    }
    batch.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AuditEntryBuilder;
    use crate::sinks::ConsoleSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingSink {
        name: String,
        writes: Arc<AtomicUsize>,
        entries: Arc<std::sync::Mutex<Vec<AuditEntry>>>,
    }

    impl AuditSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write_batch(&self, entries: &[AuditEntry]) -> Result<(), CoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().unwrap().extend_from_slice(entries);
            Ok(())
        }
    }

    #[tokio::test]
    async fn log_flushes_once_the_batch_size_is_reached() {
        let writes = Arc::new(AtomicUsize::new(0));
        let entries = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = RecordingSink { name: "recording".into(), writes: writes.clone(), entries: entries.clone() };
        let config = AuditPipelineConfig { queue_capacity: 16, batch_size: 2, flush_period: Duration::from_secs(60) };
        let pipeline = AuditPipeline::new(config, sink);

        pipeline.log(AuditEntryBuilder::new("MaxFlow").build()).await;
        pipeline.log(AuditEntryBuilder::new("MinCut").build()).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(entries.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn close_flushes_a_partial_batch() {
        let writes = Arc::new(AtomicUsize::new(0));
        let entries = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = RecordingSink { name: "recording".into(), writes: writes.clone(), entries: entries.clone() };
        let config = AuditPipelineConfig { queue_capacity: 16, batch_size: 100, flush_period: Duration::from_secs(60) };
        let pipeline = AuditPipeline::new(config, sink);

        pipeline.log(AuditEntryBuilder::new("MaxFlow").build()).await;
        pipeline.close().await.unwrap();

        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn query_delegates_to_the_sink() {
        let config = AuditPipelineConfig::default();
        let pipeline = AuditPipeline::new(config, ConsoleSink::new());
        let err = pipeline.query(&AuditFilter::default()).await.unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[tokio::test]
    async fn flush_period_triggers_a_flush_of_a_partial_batch() {
        let writes = Arc::new(AtomicUsize::new(0));
        let entries = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = RecordingSink { name: "recording".into(), writes: writes.clone(), entries: entries.clone() };
        let config = AuditPipelineConfig { queue_capacity: 16, batch_size: 100, flush_period: Duration::from_millis(20) };
        let pipeline = AuditPipeline::new(config, sink);

        pipeline.log(AuditEntryBuilder::new("MaxFlow").build()).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(writes.load(Ordering::SeqCst) >= 1);
        assert_eq!(entries.lock().unwrap().len(), 1);
    }
}
