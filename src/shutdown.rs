use log::info;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Capture is read and every packet gets a task
    Running,
    /// No new packets are read; spawned tasks run to completion
    Draining,
    Stopped,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Coordinates RUNNING → DRAINING → STOPPED.
///
/// Cloned into the capture thread, the dispatcher and each task that can hit
/// a fatal error. Draining only stops intake; nothing in flight is cancelled
/// and there is no deadline on the drain.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

struct Inner {
    token: CancellationToken,
    phase: AtomicU8,
    fatal: Mutex<Option<String>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                phase: AtomicU8::new(Phase::Running as u8),
                fatal: Mutex::new(None),
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.inner.phase.load(Ordering::Acquire))
    }

    /// True once draining has begun. Checked by the capture loop between reads.
    pub fn is_draining(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Resolves when draining begins.
    pub async fn draining(&self) {
        self.inner.token.cancelled().await
    }

    /// Stop taking new packets. Later calls are no-ops.
    pub fn begin_drain(&self) {
        if self
            .inner
            .phase
            .compare_exchange(
                Phase::Running as u8,
                Phase::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            info!("Stopping capture, waiting for in-flight tasks to finish");
        }
        self.inner.token.cancel();
    }

    /// Record an error that must end the process with a failure status, then
    /// drain. Only the first reason is kept, and it is reported once by
    /// whoever inspects `fatal_error` after the run. Returns false if a reason
    /// was already recorded.
    pub fn fatal(&self, reason: impl Into<String>) -> bool {
        let first = {
            let mut fatal = match self.inner.fatal.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if fatal.is_some() {
                false
            } else {
                *fatal = Some(reason.into());
                true
            }
        };
        self.begin_drain();
        first
    }

    pub fn fatal_error(&self) -> Option<String> {
        match self.inner.fatal.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn mark_stopped(&self) {
        self.inner
            .phase
            .store(Phase::Stopped as u8, Ordering::Release);
    }

    /// Wait for SIGINT or SIGTERM (or for draining to start some other way)
    /// and begin draining.
    pub async fn listen_for_signals(self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut terminate = signal(SignalKind::terminate())?;
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    res?;
                    info!("Received interrupt signal");
                }
                _ = terminate.recv() => info!("Received termination signal"),
                _ = self.draining() => return Ok(()),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    res?;
                    info!("Received interrupt signal");
                }
                _ = self.draining() => return Ok(()),
            }
        }

        self.begin_drain();
        Ok(())
    }
}
