//! In-memory user registry keyed by user name

use crate::domain::types::{UserId, VisitedLocation};
use crate::domain::user::User;
use crate::io::gps::random_location;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use rand::Rng;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::info;

/// Days of history generated for seeded users
const SEED_HISTORY_DAYS: i64 = 30;

#[derive(Default)]
pub struct UserRegistry {
    users: RwLock<FxHashMap<String, Arc<User>>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user. An existing user with the same name is kept.
    /// Returns true if the user was added.
    pub fn add(&self, user: Arc<User>) -> bool {
        let mut users = self.users.write();
        if users.contains_key(user.user_name()) {
            return false;
        }
        users.insert(user.user_name().to_string(), user);
        true
    }

    pub fn get(&self, user_name: &str) -> Option<Arc<User>> {
        self.users.read().get(user_name).cloned()
    }

    /// Snapshot of every registered user
    pub fn all(&self) -> Vec<Arc<User>> {
        self.users.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Create `count` internal test users, each with `locations` random
    /// visits spread over the last month
    pub fn seed_internal_users(&self, count: usize, locations: usize) -> usize {
        let mut rng = rand::thread_rng();
        let mut added = 0;
        for i in 0..count {
            let user_name = format!("internalUser{i}");
            let user = User::new(UserId::new(), &user_name, "000", &format!("{user_name}@tourGuide.com"));
            for _ in 0..locations {
                let days_ago = rng.gen_range(0..SEED_HISTORY_DAYS);
                let time_visited = Utc::now() - ChronoDuration::days(days_ago);
                let location = random_location(&mut rng);
                user.add_visited_location(VisitedLocation::new(user.id(), location, time_visited));
            }
            if self.add(Arc::new(user)) {
                added += 1;
            }
        }
        info!(users = %added, locations_per_user = %locations, "internal_users_seeded");
        added
    }
}
