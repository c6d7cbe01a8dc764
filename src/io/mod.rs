//! IO modules - external collaborator interfaces
//!
//! This module contains the external services the engine depends on:
//! - `gps` - location provider and attraction catalog
//! - `reward_central` - reward point oracle
//! - `trip_pricer` - trip offer pricing
//!
//! Each exposes an async trait plus a simulated implementation.

pub mod gps;
pub mod reward_central;
pub mod trip_pricer;

// Re-export commonly used types
pub use gps::{LocationProvider, SimulatedGps};
pub use reward_central::{RewardOracle, SimulatedRewardCentral};
pub use trip_pricer::{SimulatedTripPricer, TripPricer, TripQuote};
