//! Test doubles for the external collaborators.
//!
//! `FixedGps` reports a configurable position and catalog and counts calls;
//! `ConstantOracle` returns a fixed point value, optionally slowly or failing
//! for chosen attractions. Used by unit tests, integration tests and the load
//! harness.

use crate::domain::geo::STATUTE_MILES_PER_NAUTICAL_MILE;
use crate::domain::types::{Attraction, AttractionId, Location, UserId, VisitedLocation};
use crate::domain::user::User;
use crate::io::{LocationProvider, RewardOracle};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Attraction `miles` due north of `origin`
pub fn attraction_north_of(name: &str, origin: Location, miles: f64) -> Attraction {
    let degrees = miles / (60.0 * STATUTE_MILES_PER_NAUTICAL_MILE);
    Attraction::new(name, "Testville", "TS", origin.latitude + degrees, origin.longitude)
}

/// Fresh user with no history
pub fn test_user(name: &str) -> Arc<User> {
    Arc::new(User::new(UserId::new(), name, "000", &format!("{name}@tourGuide.com")))
}

/// Location provider with a fixed position and catalog
pub struct FixedGps {
    location: Mutex<Location>,
    catalog: Vec<Attraction>,
    location_calls: AtomicUsize,
    catalog_calls: AtomicUsize,
    fail_locations: AtomicBool,
    fail_catalog: AtomicBool,
    delay: Duration,
}

impl FixedGps {
    pub fn new(location: Location, catalog: Vec<Attraction>) -> Self {
        Self {
            location: Mutex::new(location),
            catalog,
            location_calls: AtomicUsize::new(0),
            catalog_calls: AtomicUsize::new(0),
            fail_locations: AtomicBool::new(false),
            fail_catalog: AtomicBool::new(false),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_location(&self, location: Location) {
        *self.location.lock() = location;
    }

    pub fn fail_locations(&self, fail: bool) {
        self.fail_locations.store(fail, Ordering::SeqCst);
    }

    pub fn fail_catalog(&self, fail: bool) {
        self.fail_catalog.store(fail, Ordering::SeqCst);
    }

    pub fn location_calls(&self) -> usize {
        self.location_calls.load(Ordering::SeqCst)
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for FixedGps {
    async fn current_location(&self, user_id: UserId) -> anyhow::Result<VisitedLocation> {
        self.location_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_locations.load(Ordering::SeqCst) {
            return Err(anyhow!("gps unavailable"));
        }
        let location = *self.location.lock();
        Ok(VisitedLocation::new(user_id, location, Utc::now()))
    }

    async fn attractions(&self) -> anyhow::Result<Vec<Attraction>> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(anyhow!("catalog unavailable"));
        }
        Ok(self.catalog.clone())
    }
}

/// Reward oracle returning a constant point value
pub struct ConstantOracle {
    points: i32,
    delay: Duration,
    calls: AtomicUsize,
    failing: Mutex<FxHashSet<AttractionId>>,
}

impl ConstantOracle {
    pub fn new(points: i32) -> Self {
        Self {
            points,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            failing: Mutex::new(FxHashSet::default()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every call for `attraction` fail
    pub fn fail_for(&self, attraction: AttractionId) {
        self.failing.lock().insert(attraction);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RewardOracle for ConstantOracle {
    async fn points_for(&self, attraction_id: AttractionId, _user_id: UserId) -> anyhow::Result<i32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.lock().contains(&attraction_id) {
            return Err(anyhow!("reward service rejected attraction {attraction_id}"));
        }
        Ok(self.points)
    }
}
