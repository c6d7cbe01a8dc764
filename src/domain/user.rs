//! Tracked user state
//!
//! A `User` is shared as `Arc<User>` between the registry, the location
//! tracker and reward workers. History and rewards live behind their own
//! locks; `reward_pass` serializes whole reward passes for one user.

use crate::domain::types::{Provider, UserId, UserPreferences, UserReward, VisitedLocation};
use parking_lot::{Mutex, RwLock};

pub struct User {
    id: UserId,
    user_name: String,
    phone_number: String,
    email_address: String,
    visited_locations: RwLock<Vec<VisitedLocation>>,
    rewards: Mutex<Vec<UserReward>>,
    preferences: RwLock<UserPreferences>,
    trip_deals: Mutex<Vec<Provider>>,
    /// Held for the duration of a reward pass (across oracle awaits)
    reward_pass: tokio::sync::Mutex<()>,
}

impl User {
    pub fn new(id: UserId, user_name: &str, phone_number: &str, email_address: &str) -> Self {
        Self {
            id,
            user_name: user_name.to_string(),
            phone_number: phone_number.to_string(),
            email_address: email_address.to_string(),
            visited_locations: RwLock::new(Vec::new()),
            rewards: Mutex::new(Vec::new()),
            preferences: RwLock::new(UserPreferences::default()),
            trip_deals: Mutex::new(Vec::new()),
            reward_pass: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn email_address(&self) -> &str {
        &self.email_address
    }

    /// Append a location to the history (newest last)
    pub fn add_visited_location(&self, visited: VisitedLocation) {
        self.visited_locations.write().push(visited);
    }

    /// Point-in-time copy of the location history
    pub fn visited_locations(&self) -> Vec<VisitedLocation> {
        self.visited_locations.read().clone()
    }

    pub fn last_visited_location(&self) -> Option<VisitedLocation> {
        self.visited_locations.read().last().cloned()
    }

    pub fn visited_location_count(&self) -> usize {
        self.visited_locations.read().len()
    }

    pub fn clear_visited_locations(&self) {
        self.visited_locations.write().clear();
    }

    /// Record a reward unless one already exists for the same attraction name.
    /// Returns true if the reward was added.
    pub fn add_reward(&self, reward: UserReward) -> bool {
        let mut rewards = self.rewards.lock();
        if rewards.iter().any(|r| r.attraction.name == reward.attraction.name) {
            return false;
        }
        rewards.push(reward);
        true
    }

    pub fn has_reward_for(&self, attraction_name: &str) -> bool {
        self.rewards.lock().iter().any(|r| r.attraction.name == attraction_name)
    }

    /// Point-in-time copy of the rewards
    pub fn rewards(&self) -> Vec<UserReward> {
        self.rewards.lock().clone()
    }

    pub fn reward_count(&self) -> usize {
        self.rewards.lock().len()
    }

    /// Cumulative reward points, as consumed by the trip pricer
    pub fn total_reward_points(&self) -> i64 {
        self.rewards.lock().iter().map(|r| i64::from(r.reward_points)).sum()
    }

    pub fn preferences(&self) -> UserPreferences {
        self.preferences.read().clone()
    }

    pub fn set_preferences(&self, preferences: UserPreferences) {
        *self.preferences.write() = preferences;
    }

    pub fn trip_deals(&self) -> Vec<Provider> {
        self.trip_deals.lock().clone()
    }

    pub fn set_trip_deals(&self, deals: Vec<Provider>) {
        *self.trip_deals.lock() = deals;
    }

    pub(crate) fn reward_pass(&self) -> &tokio::sync::Mutex<()> {
        &self.reward_pass
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("user_name", &self.user_name)
            .field("visited_locations", &self.visited_location_count())
            .field("rewards", &self.reward_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Attraction, Location};
    use chrono::Utc;

    fn user() -> User {
        User::new(UserId::new(), "jon", "000", "jon@tourGuide.com")
    }

    fn reward_for(user: &User, name: &str, points: i32) -> UserReward {
        let visited = VisitedLocation::new(user.id(), Location::new(0.0, 0.0), Utc::now());
        UserReward::new(visited, Attraction::new(name, "City", "ST", 0.0, 0.0), points)
    }

    #[test]
    fn test_last_visited_location_is_newest() {
        let user = user();
        assert!(user.last_visited_location().is_none());

        user.add_visited_location(VisitedLocation::new(user.id(), Location::new(1.0, 1.0), Utc::now()));
        user.add_visited_location(VisitedLocation::new(user.id(), Location::new(2.0, 2.0), Utc::now()));

        assert_eq!(user.visited_location_count(), 2);
        assert_eq!(user.last_visited_location().unwrap().location, Location::new(2.0, 2.0));
    }

    #[test]
    fn test_add_reward_dedups_by_attraction_name() {
        let user = user();
        assert!(user.add_reward(reward_for(&user, "Bronx Zoo", 10)));
        assert!(!user.add_reward(reward_for(&user, "Bronx Zoo", 99)));
        assert!(user.add_reward(reward_for(&user, "Kyle Field", 5)));

        assert_eq!(user.reward_count(), 2);
        assert!(user.has_reward_for("Bronx Zoo"));
        assert_eq!(user.total_reward_points(), 15);
    }

    #[test]
    fn test_snapshot_is_detached_from_later_appends() {
        let user = user();
        user.add_visited_location(VisitedLocation::new(user.id(), Location::new(1.0, 1.0), Utc::now()));
        let snapshot = user.visited_locations();
        user.add_visited_location(VisitedLocation::new(user.id(), Location::new(2.0, 2.0), Utc::now()));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(user.visited_location_count(), 2);
    }
}
