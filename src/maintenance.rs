//! Periodic background sweeps
//!
//! Expires quests, decays idle streaks and tops up quests on a fixed
//! interval. The sweep itself is blocking database work, so each tick runs
//! on the blocking pool.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::domain::MaintenanceReport;
use crate::engine::Engine;

/// Handle to a running sweep loop
pub struct MaintenanceHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<usize>,
}

impl MaintenanceHandle {
    /// Stop the loop and wait for it; returns the number of completed sweeps
    pub async fn stop(self) -> usize {
        let _ = self.stop.send(true);
        match self.task.await {
            Ok(sweeps) => sweeps,
            Err(e) => {
                error!("Maintenance task panicked: {}", e);
                0
            }
        }
    }
}

/// Run one sweep off the async runtime
pub async fn sweep(engine: Engine) -> Option<MaintenanceReport> {
    match tokio::task::spawn_blocking(move || engine.run_maintenance()).await {
        Ok(Ok(report)) => Some(report),
        Ok(Err(e)) => {
            error!("Maintenance sweep failed: {}", e);
            None
        }
        Err(e) => {
            error!("Maintenance sweep panicked: {}", e);
            None
        }
    }
}

/// Start sweeping every `every`; the first sweep runs immediately
pub fn spawn(engine: Engine, every: Duration) -> MaintenanceHandle {
    let (stop, mut stopped) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!("Maintenance loop started (every {:?})", every);
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut sweeps = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(report) = sweep(engine.clone()).await {
                        sweeps += 1;
                        debug!("Sweep {} done: {:?}", sweeps, report);
                    }
                }
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Maintenance loop stopped after {} sweeps", sweeps);
        sweeps
    });

    MaintenanceHandle { stop, task }
}
