use crate::config::{Backpressure, DispatchConfig, ErrorPolicy};
use crate::dispatch::{Dispatcher, PipelineStats, RunSummary};
use crate::output::RecordSink;
use crate::pcap::{Next, PacketSource, RawPacket};
use crate::shutdown::Shutdown;
use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Run capture → dispatch → sink until `shutdown` starts draining or the
/// source closes.
///
/// Returns once the capture thread has stopped, every queued packet has been
/// dispatched, every task has finished its write, and the source has been
/// closed. Fails if a fatal sink error was recorded along the way.
pub async fn run<S>(
    source: S,
    sink: Arc<dyn RecordSink>,
    config: &DispatchConfig,
    on_error: ErrorPolicy,
    shutdown: Shutdown,
) -> Result<RunSummary>
where
    S: PacketSource + 'static,
{
    let stats = Arc::new(PipelineStats::default());
    let (tx, rx) = mpsc::channel(config.queue_depth);

    let capture = tokio::task::spawn_blocking({
        let shutdown = shutdown.clone();
        let stats = Arc::clone(&stats);
        let backpressure = config.backpressure;
        move || capture_loop(source, tx, backpressure, &shutdown, &stats)
    });

    let dispatcher = Dispatcher::new(config, sink, on_error, stats, shutdown.clone());
    let summary = dispatcher.run(rx).await;

    let mut source = capture.await.context("capture thread panicked")?;
    source.close();
    shutdown.mark_stopped();

    info!(
        "Capture stopped: {} packets captured, {} dropped, {} without a record, \
         {} written, {} write failures",
        summary.captured,
        summary.dropped,
        summary.no_record,
        summary.written,
        summary.write_failures
    );

    if let Some(reason) = shutdown.fatal_error() {
        bail!(reason);
    }
    Ok(summary)
}

/// Read packets on a blocking thread and feed the dispatch queue.
///
/// Shutdown is checked between reads, so the read timeout bounds how long
/// draining waits for this loop. The source is handed back unclosed; it is
/// closed only after in-flight tasks finish.
pub fn capture_loop<S: PacketSource>(
    mut source: S,
    queue: mpsc::Sender<RawPacket>,
    backpressure: Backpressure,
    shutdown: &Shutdown,
    stats: &PipelineStats,
) -> S {
    while !shutdown.is_draining() {
        let packet = match source.next_packet() {
            Ok(Next::Packet(packet)) => packet,
            Ok(Next::TimedOut) => continue,
            Ok(Next::Closed) => {
                info!("Capture source closed");
                shutdown.begin_drain();
                break;
            }
            Err(e) => {
                warn!("Error reading packet: {e}");
                continue;
            }
        };
        stats.captured();

        match backpressure {
            Backpressure::Block => {
                if queue.blocking_send(packet).is_err() {
                    break;
                }
            }
            Backpressure::Drop => match queue.try_send(packet) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => stats.dropped(),
                Err(TrySendError::Closed(_)) => break,
            },
        }
    }

    info!("Packet capture loop terminated");
    source
}
