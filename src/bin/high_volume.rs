//! High volume load harness
//!
//! Times a full tracking cycle and a full reward pass over N generated users.
//!
//! Run with: cargo run --bin high-volume --release -- --users 100000

use anyhow::{bail, Context};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tourguide::domain::types::VisitedLocation;
use tourguide::infra::{logging, Config, Metrics};
use tourguide::io::gps::default_catalog;
use tourguide::io::{SimulatedGps, SimulatedRewardCentral, SimulatedTripPricer};
use tourguide::services::{Collaborators, TourGuide};

/// Upper bound for tracking 100k users
const TRACK_LIMIT: Duration = Duration::from_secs(15 * 60);
/// Upper bound for rewarding 100k users
const REWARD_LIMIT: Duration = Duration::from_secs(20 * 60);

#[derive(Parser, Debug)]
#[command(name = "high-volume", about = "Tracking and reward throughput harness")]
struct Args {
    /// Number of generated users
    #[arg(long, default_value = "100")]
    users: usize,

    /// Optional TOML config; defaults are used otherwise
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    reward_workers: Option<usize>,

    #[arg(long)]
    tracking_workers: Option<usize>,

    #[arg(long)]
    chunk_size: Option<usize>,

    /// Simulated GPS latency per call
    #[arg(long, default_value = "0")]
    gps_latency_ms: u64,

    /// Simulated reward central latency per call
    #[arg(long, default_value = "0")]
    rewards_latency_ms: u64,

    /// Print the final metrics summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init("warn", false);

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config = config.with_internal_users(args.users);
    if let Some(workers) = args.reward_workers {
        config = config.with_reward_workers(workers);
    }
    if let Some(workers) = args.tracking_workers {
        config = config.with_tracking_workers(workers);
    }
    if let Some(chunk_size) = args.chunk_size {
        config = config.with_chunk_size(chunk_size);
    }

    let catalog = config.catalog().unwrap_or_else(default_catalog);
    let first_attraction = catalog.first().cloned().context("attraction catalog is empty")?;
    let collaborators = Collaborators {
        provider: Arc::new(SimulatedGps::new(catalog, Duration::from_millis(args.gps_latency_ms))),
        oracle: Arc::new(SimulatedRewardCentral::new(Duration::from_millis(args.rewards_latency_ms))),
        pricer: Arc::new(SimulatedTripPricer),
    };

    let metrics = Arc::new(Metrics::new());
    let guide = TourGuide::new(config.clone(), collaborators, metrics.clone());
    let users = guide.all_users();

    println!("High Volume - {} users", users.len());
    println!(
        "reward_workers={} tracking_workers={} chunk_size={} mode={}",
        config.reward_workers(),
        config.tracking_workers(),
        config.chunk_size(),
        config.reward_mode().as_str()
    );

    // Phase 1: one tracking cycle over every user
    let start = Instant::now();
    let tracked = guide.track_users(&users).await?;
    let track_elapsed = start.elapsed();
    println!("\n=== Track Location ===");
    println!("Tracked: {}", tracked);
    println!("Time: {:.2}s", track_elapsed.as_secs_f64());

    // Phase 2: every user stands on the first attraction, then a full reward pass
    for user in &users {
        user.clear_visited_locations();
        user.add_visited_location(VisitedLocation::new(
            user.id(),
            first_attraction.location,
            chrono::Utc::now(),
        ));
    }

    let start = Instant::now();
    let chunks = guide.calculate_rewards_for_all(&users).await?;
    let reward_elapsed = start.elapsed();
    let unrewarded = users.iter().filter(|u| u.reward_count() == 0).count();
    println!("\n=== Get Rewards ===");
    println!("Chunks: {}", chunks);
    println!("Users without reward: {}", unrewarded);
    println!("Time: {:.2}s", reward_elapsed.as_secs_f64());

    let summary = metrics.report(users.len());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.log();
    }

    if unrewarded > 0 {
        bail!("{} users received no reward", unrewarded);
    }
    if track_elapsed > TRACK_LIMIT {
        bail!("tracking took {:.0}s, limit {}s", track_elapsed.as_secs_f64(), TRACK_LIMIT.as_secs());
    }
    if reward_elapsed > REWARD_LIMIT {
        bail!("rewards took {:.0}s, limit {}s", reward_elapsed.as_secs_f64(), REWARD_LIMIT.as_secs());
    }
    Ok(())
}
