//! Shared types for the tour guide engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newtype wrapper for user IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for attraction IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AttractionId(pub Uuid);

impl AttractionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttractionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttractionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A location a user was observed at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitedLocation {
    pub user_id: UserId,
    pub location: Location,
    pub time_visited: DateTime<Utc>,
}

impl VisitedLocation {
    pub fn new(user_id: UserId, location: Location, time_visited: DateTime<Utc>) -> Self {
        Self { user_id, location, time_visited }
    }
}

/// Point of interest from the attraction catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub id: AttractionId,
    pub name: String,
    pub city: String,
    pub state: String,
    pub location: Location,
}

impl Attraction {
    pub fn new(name: &str, city: &str, state: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            id: AttractionId::new(),
            name: name.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            location: Location::new(latitude, longitude),
        }
    }
}

/// Reward granted to a user for visiting near an attraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReward {
    pub visited_location: VisitedLocation,
    pub attraction: Attraction,
    pub reward_points: i32,
}

impl UserReward {
    pub fn new(visited_location: VisitedLocation, attraction: Attraction, reward_points: i32) -> Self {
        Self { visited_location, attraction, reward_points }
    }
}

/// Trip preferences forwarded to the trip pricer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Miles within which the user cares about attractions
    pub attraction_proximity: u32,
    /// Trip length in nights
    pub trip_duration: u32,
    pub ticket_quantity: u32,
    pub number_of_adults: u32,
    pub number_of_children: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            attraction_proximity: u32::MAX,
            trip_duration: 1,
            ticket_quantity: 1,
            number_of_adults: 1,
            number_of_children: 0,
        }
    }
}

/// A priced trip offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub price: f64,
    pub trip_id: Uuid,
}

/// One row of a nearest-attractions query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyAttraction {
    pub attraction_name: String,
    pub attraction_location: Location,
    pub user_location: Location,
    pub distance_miles: f64,
    pub reward_points: i32,
}
