//! Background reclamation of expired leases.

use std::sync::Arc;
use std::time::Duration;

use catalog::Catalog;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{ReservationManager, Result, SweepReport, store::ReservationStore};

/// Default pause between two scheduled sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(120);

/// Runs [`ReservationManager::sweep_expired`] on a fixed interval and on
/// demand.
///
/// Scheduled and on-demand sweeps may overlap freely; the store makes each
/// deletion conditional on expiry at delete time.
pub struct ReclaimScheduler<S: ReservationStore, C: Catalog> {
    manager: Arc<ReservationManager<S, C>>,
    interval: Duration,
}

impl<S: ReservationStore, C: Catalog> Clone for ReclaimScheduler<S, C> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            interval: self.interval,
        }
    }
}

/// Handle to a running scheduler task.
pub struct ReclaimHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ReclaimHandle {
    /// Stops the loop and waits for the in-flight sweep, if any, to finish.
    pub async fn shutdown(self) {
        // A closed channel means the loop has already exited.
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "reclaim scheduler task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<S, C> ReclaimScheduler<S, C>
where
    S: ReservationStore + 'static,
    C: Catalog + 'static,
{
    /// Creates a scheduler sweeping every `interval`.
    pub fn new(manager: Arc<ReservationManager<S, C>>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs a sweep immediately and propagates storage errors to the caller.
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        tracing::debug!("on-demand sweep requested");
        self.manager.sweep_expired().await
    }

    /// Runs one scheduled sweep. Errors are logged and left for the next
    /// tick.
    pub async fn tick(&self) -> Option<SweepReport> {
        match self.manager.sweep_expired().await {
            Ok(report) => Some(report),
            Err(e) => {
                metrics::counter!("reservation_sweep_errors_total").increment(1);
                tracing::error!(error = %e, transient = e.is_transient(), "reservation sweep failed");
                None
            }
        }
    }

    /// Spawns the periodic loop onto the current Tokio runtime.
    ///
    /// The first sweep runs immediately.
    pub fn spawn(self) -> ReclaimHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        ReclaimHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "reclaim scheduler starting");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("reclaim scheduler shutting down");
                    break;
                }
            }
        }

        tracing::info!("reclaim scheduler stopped");
    }
}
