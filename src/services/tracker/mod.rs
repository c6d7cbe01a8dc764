//! Background tracking loop
//!
//! The Tracker periodically tracks every registered user:
//! - one `track_all` cycle per poll interval (the first runs immediately)
//! - explicit `start()`/`stop()` lifecycle driven by a watch channel
//! - `stop()` lets an in-flight cycle finish before returning


use crate::infra::metrics::Metrics;
use crate::services::location_tracker::LocationTracker;
use crate::services::user_registry::UserRegistry;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

struct Running {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct Tracker {
    location_tracker: Arc<LocationTracker>,
    registry: Arc<UserRegistry>,
    metrics: Arc<Metrics>,
    poll_interval: Duration,
    running: Mutex<Option<Running>>,
}

impl Tracker {
    pub fn new(
        location_tracker: Arc<LocationTracker>,
        registry: Arc<UserRegistry>,
        metrics: Arc<Metrics>,
        poll_interval: Duration,
    ) -> Self {
        Self { location_tracker, registry, metrics, poll_interval, running: Mutex::new(None) }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().as_ref().is_some_and(|r| !r.handle.is_finished())
    }

    /// Spawn the tracking loop. Returns false if it is already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.location_tracker.clone(),
            self.registry.clone(),
            self.metrics.clone(),
            self.poll_interval,
            shutdown_rx,
        ));
        *running = Some(Running { shutdown_tx, handle });
        info!(poll_interval_secs = %self.poll_interval.as_secs(), "tracker_started");
        true
    }

    /// Signal the loop and wait for it to exit
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };

        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.handle.await {
            warn!(error = %e, "tracker_task_failed");
        }
        info!("tracker_stopped");
    }
}

async fn run_loop(
    location_tracker: Arc<LocationTracker>,
    registry: Arc<UserRegistry>,
    metrics: Arc<Metrics>,
    poll_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let users = registry.all();
                let start = Instant::now();
                match location_tracker.track_all(&users).await {
                    Ok(tracked) => {
                        info!(
                            users = %users.len(),
                            tracked = %tracked,
                            elapsed_ms = %start.elapsed().as_millis(),
                            "tracking_cycle_completed"
                        );
                    }
                    Err(e) => {
                        warn!(
                            users = %users.len(),
                            failures = %e.failure_count(),
                            error = %e,
                            elapsed_ms = %start.elapsed().as_millis(),
                            "tracking_cycle_failed"
                        );
                    }
                }
                metrics.record_tracking_cycle();
            }
        }
    }
}
