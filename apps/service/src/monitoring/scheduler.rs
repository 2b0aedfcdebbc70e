use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use super::monitor::HealthMonitor;

/// Monitoring scheduler - drives check cycles on a fixed interval
pub struct MonitoringScheduler {
    monitor: Arc<HealthMonitor>,
    interval: Duration,
}

/// Handle to a running scheduler
///
/// Stopping only prevents further cycles; a cycle already running is allowed
/// to finish. Dropping the handle stops the scheduler as well.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl MonitoringScheduler {
    /// Create a new monitoring scheduler
    pub fn new(monitor: Arc<HealthMonitor>, interval: Duration) -> Self {
        Self { monitor, interval }
    }

    /// Start the background loop; the first cycle runs immediately
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(interval_secs = self.interval.as_secs_f64(), "Monitoring scheduler started");
        let handle = tokio::spawn(run_loop(self.monitor, self.interval, shutdown_rx));

        SchedulerHandle { shutdown_tx, handle }
    }
}

impl SchedulerHandle {
    /// Signal the loop to stop after the current cycle
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop and wait for any in-progress cycle to finish
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Monitoring scheduler task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn run_loop(monitor: Arc<HealthMonitor>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = timer.tick() => {}
        }

        // Not raced against shutdown, a started cycle always completes
        monitor.run_cycle().await;

        if *shutdown.borrow() {
            break;
        }
    }

    debug!("Monitoring scheduler stopped");
}
