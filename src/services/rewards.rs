//! Reward engine - awards each attraction at most once per user
//!
//! A reward pass walks every (visited location, attraction) pair of a user
//! against point-in-time snapshots of the history and the catalog. Pairs for
//! an already-rewarded attraction are skipped; pairs within the proximity
//! buffer get their point value from the reward oracle.
//!
//! Passes for the same user are serialized by the user's pass lock, so two
//! overlapping passes can never both see an attraction as unrewarded.

use crate::domain::geo::{distance_miles, is_within};
use crate::domain::types::{Attraction, Location, UserId, UserReward, VisitedLocation};
use crate::domain::user::User;
use crate::error::{Error, Result};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::{LocationProvider, RewardOracle};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct RewardEngine {
    provider: Arc<dyn LocationProvider>,
    oracle: Arc<dyn RewardOracle>,
    default_proximity_buffer: f64,
    proximity_buffer: RwLock<f64>,
    attraction_proximity_range: f64,
    metrics: Arc<Metrics>,
}

impl RewardEngine {
    pub fn new(
        config: &Config,
        provider: Arc<dyn LocationProvider>,
        oracle: Arc<dyn RewardOracle>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            provider,
            oracle,
            default_proximity_buffer: config.proximity_buffer_miles(),
            proximity_buffer: RwLock::new(config.proximity_buffer_miles()),
            attraction_proximity_range: config.attraction_proximity_range_miles(),
            metrics,
        }
    }

    pub fn proximity_buffer(&self) -> f64 {
        *self.proximity_buffer.read()
    }

    pub fn set_proximity_buffer(&self, miles: f64) {
        *self.proximity_buffer.write() = miles;
    }

    pub fn reset_proximity_buffer(&self) {
        *self.proximity_buffer.write() = self.default_proximity_buffer;
    }

    /// Classification only: is `location` within the wide attraction radius
    pub fn is_within_attraction_proximity(&self, attraction: &Attraction, location: &Location) -> bool {
        is_within(&attraction.location, location, self.attraction_proximity_range)
    }

    /// Reward gate: is the visited location within the proximity buffer
    pub fn near_attraction(&self, visited: &VisitedLocation, attraction: &Attraction) -> bool {
        distance_miles(&attraction.location, &visited.location) <= self.proximity_buffer()
    }

    /// Point value of `attraction` for `user_id`
    pub async fn reward_points(&self, attraction: &Attraction, user_id: UserId) -> Result<i32> {
        let start = Instant::now();
        let points = self.oracle.points_for(attraction.id, user_id).await.map_err(|source| {
            Error::Oracle { user: user_id, attraction: attraction.name.clone(), source }
        })?;
        self.metrics.record_oracle_latency(start.elapsed().as_micros() as u64);
        Ok(points)
    }

    /// Run one reward pass for `user`. Returns the number of new rewards.
    ///
    /// An oracle failure aborts the rest of the pass; rewards granted before
    /// the failure are kept.
    pub async fn calculate_rewards(&self, user: &User) -> Result<usize> {
        let _pass = user.reward_pass().lock().await;

        let visited_locations = user.visited_locations();
        let attractions = match self.provider.attractions().await {
            Ok(attractions) => attractions,
            Err(source) => {
                self.metrics.record_reward_pass_failure();
                return Err(Error::Catalog(source));
            }
        };

        let mut awarded = 0;
        for visited in &visited_locations {
            for attraction in &attractions {
                if user.has_reward_for(&attraction.name) {
                    continue;
                }
                if !self.near_attraction(visited, attraction) {
                    continue;
                }

                let points = match self.reward_points(attraction, user.id()).await {
                    Ok(points) => points,
                    Err(e) => {
                        self.metrics.record_reward_pass_failure();
                        return Err(e);
                    }
                };
                if user.add_reward(UserReward::new(visited.clone(), attraction.clone(), points)) {
                    awarded += 1;
                    info!(
                        user = %user.user_name(),
                        attraction = %attraction.name,
                        points = %points,
                        "reward_awarded"
                    );
                }
            }
        }

        self.metrics.record_reward_pass(awarded);
        debug!(
            user = %user.user_name(),
            locations = %visited_locations.len(),
            attractions = %attractions.len(),
            awarded = %awarded,
            "reward_pass_completed"
        );
        Ok(awarded)
    }
}
