//! EvictionWorker: dedicated thread sweeping expired idempotency records,
//! idle snapshots, lapsed leases, and compactable change-log events.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use steadfast_core::tracing::events;
use steadfast_core::traits::{Clock, Evictable};

use crate::metrics::GatewayMetrics;

/// Totals of one or more sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub sweeps: u64,
    pub evicted: u64,
    pub failures: u64,
}

impl SweepReport {
    fn absorb(&mut self, other: SweepReport) {
        self.sweeps += other.sweeps;
        self.evicted += other.evicted;
        self.failures += other.failures;
    }
}

/// Sweep every target once. A failing target is logged and skipped; the
/// others still run.
pub fn sweep_once(
    targets: &[Arc<dyn Evictable>],
    clock: &dyn Clock,
    metrics: &GatewayMetrics,
) -> SweepReport {
    let mut report = SweepReport {
        sweeps: 1,
        ..Default::default()
    };
    for target in targets {
        let span = steadfast_core::eviction_span!(target.name());
        let _entered = span.enter();
        match target.evict_expired(clock.now()) {
            Ok(evicted) => {
                events::eviction_completed(target.name(), evicted);
                metrics.record_evictions(evicted);
                report.evicted += evicted as u64;
            }
            Err(e) => {
                events::eviction_failed(target.name(), &e.to_string());
                metrics.record_eviction_failure();
                report.failures += 1;
            }
        }
    }
    report
}

/// Handle to the background sweeper. Dropping it stops the thread.
pub struct EvictionWorker {
    shutdown: Option<Sender<()>>,
    join: Option<JoinHandle<SweepReport>>,
}

impl EvictionWorker {
    /// Spawn the sweeper. It sweeps every `interval` until shut down.
    pub fn spawn(
        targets: Vec<Arc<dyn Evictable>>,
        clock: Arc<dyn Clock>,
        metrics: Arc<GatewayMetrics>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let (tx, rx) = bounded::<()>(1);
        let join = thread::Builder::new()
            .name("steadfast-eviction".to_string())
            .spawn(move || {
                let mut total = SweepReport::default();
                loop {
                    match rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            total.absorb(sweep_once(&targets, clock.as_ref(), &metrics));
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!(sweeps = total.sweeps, evicted = total.evicted, "eviction worker stopped");
                total
            })?;
        Ok(Self {
            shutdown: Some(tx),
            join: Some(join),
        })
    }

    /// Stop the thread and return what it did.
    pub fn shutdown(mut self) -> SweepReport {
        self.stop()
    }

    fn stop(&mut self) -> SweepReport {
        if let Some(tx) = self.shutdown.take() {
            // A full channel already carries a stop signal.
            let _ = tx.try_send(());
        }
        match self.join.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => SweepReport::default(),
        }
    }
}

impl Drop for EvictionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
