//! TourGuide - proximity rewards service
//!
//! Tracks user locations on a fixed interval and awards points for
//! attractions visited within the proximity buffer.
//!
//! Module structure:
//! - `domain/` - Core types (User, Location, Attraction, geo math)
//! - `io/` - External collaborators (GPS, reward central, trip pricer)
//! - `services/` - Business logic (RewardEngine, BatchCoordinator, Tracker)
//! - `infra/` - Infrastructure (Config, Metrics, logging)

use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tourguide::infra::{logging, Config, Metrics};
use tourguide::services::{Collaborators, TourGuide};
use tracing::info;

/// TourGuide - proximity rewards service
#[derive(Parser, Debug)]
#[command(name = "tourguide", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Default: INFO, use RUST_LOG=debug for per-location events
    logging::init("info", args.json_logs);

    info!(git_hash = %env!("GIT_HASH"), "tourguide starting");

    let config = Config::load_from_path(&args.config);
    info!(
        config_file = %config.config_file(),
        proximity_buffer_miles = %config.proximity_buffer_miles(),
        reward_mode = %config.reward_mode().as_str(),
        chunk_size = %config.chunk_size(),
        reward_workers = %config.reward_workers(),
        tracking_workers = %config.tracking_workers(),
        nearby_count = %config.nearby_count(),
        tracker_enabled = %config.tracker_enabled(),
        poll_interval_secs = %config.tracker_poll_interval().as_secs(),
        internal_users = %config.internal_users(),
        internal_user_count = %config.internal_user_count(),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());
    let collaborators = Collaborators::simulated(&config);
    let guide = TourGuide::new(config.clone(), collaborators, metrics.clone());
    info!(users = %guide.all_users().len(), "tour_guide_ready");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    // Start metrics reporter (lock-free reads with full summary)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    let user_count = guide.all_users().len();
    let mut reporter_shutdown = shutdown_rx.clone();
    let reporter = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    metrics_clone.report(user_count).log();
                }
                _ = reporter_shutdown.changed() => break,
            }
        }
    });

    if config.tracker_enabled() {
        guide.start_tracking();
    } else {
        info!("tracker_disabled");
    }

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let _ = shutdown_rx.changed().await;

    guide.shutdown().await;
    let _ = reporter.await;
    metrics.report(guide.all_users().len()).log();

    info!("tourguide shutdown complete");
    Ok(())
}
