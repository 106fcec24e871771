use crate::config::{DispatchConfig, ErrorPolicy};
use crate::output::RecordSink;
use crate::pcap::{RawPacket, decode_packet};
use crate::shutdown::Shutdown;
use log::{debug, error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::task::TaskTracker;

/// Counters shared by the capture thread and every packet task.
#[derive(Debug, Default)]
pub struct PipelineStats {
    captured: AtomicU64,
    dropped: AtomicU64,
    no_record: AtomicU64,
    written: AtomicU64,
    write_failures: AtomicU64,
}

impl PipelineStats {
    pub fn captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            captured: self.captured.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            no_record: self.no_record.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Final counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Packets read from the capture source
    pub captured: u64,
    /// Packets discarded because the dispatch queue was full
    pub dropped: u64,
    /// Packets that were not DNS responses or failed to decode
    pub no_record: u64,
    pub written: u64,
    pub write_failures: u64,
}

/// Spawns one task per packet, never more than `max_in_flight` at a time.
pub struct Dispatcher {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    sink: Arc<dyn RecordSink>,
    on_error: ErrorPolicy,
    stats: Arc<PipelineStats>,
    shutdown: Shutdown,
}

impl Dispatcher {
    pub fn new(
        config: &DispatchConfig,
        sink: Arc<dyn RecordSink>,
        on_error: ErrorPolicy,
        stats: Arc<PipelineStats>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(config.max_in_flight)),
            sink,
            on_error,
            stats,
            shutdown,
        }
    }

    /// Dispatch packets until the queue closes, then wait for every spawned
    /// task to finish.
    pub async fn run(self, mut queue: mpsc::Receiver<RawPacket>) -> RunSummary {
        while let Some(packet) = queue.recv().await {
            self.dispatch(packet).await;
        }

        self.tracker.close();
        if !self.tracker.is_empty() {
            info!("Waiting for {} in-flight tasks", self.tracker.len());
        }
        self.tracker.wait().await;

        self.stats.summary()
    }

    async fn dispatch(&self, packet: RawPacket) {
        // The semaphore is never closed, so acquire only fails if that changes
        let Ok(permit) = self.permits.clone().acquire_owned().await else {
            return;
        };

        let sink = Arc::clone(&self.sink);
        let stats = Arc::clone(&self.stats);
        let shutdown = self.shutdown.clone();
        let on_error = self.on_error;

        self.tracker.spawn(async move {
            handle_packet(packet, sink.as_ref(), &stats, on_error, &shutdown).await;
            drop(permit);
        });
    }
}

/// Decode one packet and, if it is a DNS response, write the record.
pub async fn handle_packet(
    packet: RawPacket,
    sink: &dyn RecordSink,
    stats: &PipelineStats,
    on_error: ErrorPolicy,
    shutdown: &Shutdown,
) {
    let record = match decode_packet(&packet) {
        Ok(Some(record)) => record,
        Ok(None) => {
            stats.no_record.fetch_add(1, Ordering::Relaxed);
            return;
        }
        Err(e) => {
            debug!("Dropped packet: {e}");
            stats.no_record.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    drop(packet);

    match sink.write(&record).await {
        Ok(()) => {
            stats.written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            stats.write_failures.fetch_add(1, Ordering::Relaxed);
            match on_error {
                ErrorPolicy::Log => error!("Failed to write record to {}: {e}", sink.name()),
                ErrorPolicy::Fatal => {
                    let reason = format!("Failed to write record to {}: {e}", sink.name());
                    if !shutdown.fatal(reason) {
                        debug!("Write failed after fatal error: {e}");
                    }
                }
            }
        }
    }
}
