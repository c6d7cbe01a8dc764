//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `tour_guide` - Public facade wiring everything together
//! - `user_registry` - In-memory users by name
//! - `location_tracker` - Location fetch and reward hand-off
//! - `tracker` - Background tracking loop
//! - `rewards` - Reward engine (per-user reward passes)
//! - `batch` - Batch coordinator (pending set, chunked submission)
//! - `barrier` - Completion barrier over submitted tasks
//! - `worker_pool` - Bounded task pools
//! - `ranker` - Attraction ranking by distance

pub mod barrier;
pub mod batch;
pub mod location_tracker;
pub mod ranker;
pub mod rewards;
pub mod tour_guide;
pub mod tracker;
pub mod user_registry;
pub mod worker_pool;

// Re-export commonly used types
pub use barrier::CompletionBarrier;
pub use batch::BatchCoordinator;
pub use location_tracker::LocationTracker;
pub use ranker::{AttractionRanker, Ranking};
pub use rewards::RewardEngine;
pub use tour_guide::{Collaborators, TourGuide};
pub use tracker::Tracker;
pub use user_registry::UserRegistry;
pub use worker_pool::WorkerPool;
