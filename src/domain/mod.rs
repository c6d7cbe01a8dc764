//! Domain models - core business types
//!
//! This module contains the canonical data types used throughout the system:
//! - `User` - tracked individual with location history and rewards
//! - `VisitedLocation`, `Attraction`, `UserReward` - value types
//! - `geo` - great-circle distance

pub mod geo;
pub mod types;
pub mod user;

// Re-export commonly used types at module level
pub use types::{
    Attraction, AttractionId, Location, NearbyAttraction, Provider, UserId, UserPreferences,
    UserReward, VisitedLocation,
};
pub use user::User;
