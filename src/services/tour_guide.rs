//! TourGuide - the public facade over users, tracking and rewards
//!
//! Wires the reward engine, batch coordinator, location tracker, ranker and
//! background tracker around one set of collaborators, and exposes the
//! user-facing queries (rewards, location, nearby attractions, trip deals).

use crate::domain::types::{NearbyAttraction, Provider, UserReward, VisitedLocation};
use crate::domain::user::User;
use crate::error::{Error, Result};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::gps::default_catalog;
use crate::io::{
    LocationProvider, RewardOracle, SimulatedGps, SimulatedRewardCentral, SimulatedTripPricer,
    TripPricer, TripQuote,
};
use crate::services::batch::BatchCoordinator;
use crate::services::location_tracker::LocationTracker;
use crate::services::ranker::AttractionRanker;
use crate::services::rewards::RewardEngine;
use crate::services::tracker::Tracker;
use crate::services::user_registry::UserRegistry;
use crate::services::worker_pool::WorkerPool;
use std::sync::Arc;
use tracing::{debug, info};

/// External services the engine talks to
#[derive(Clone)]
pub struct Collaborators {
    pub provider: Arc<dyn LocationProvider>,
    pub oracle: Arc<dyn RewardOracle>,
    pub pricer: Arc<dyn TripPricer>,
}

impl Collaborators {
    /// Simulated backends, using the configured catalog and latencies
    pub fn simulated(config: &Config) -> Self {
        let catalog = config.catalog().unwrap_or_else(default_catalog);
        Self {
            provider: Arc::new(SimulatedGps::new(catalog, config.gps_latency())),
            oracle: Arc::new(SimulatedRewardCentral::new(config.rewards_latency())),
            pricer: Arc::new(SimulatedTripPricer),
        }
    }
}

pub struct TourGuide {
    config: Config,
    registry: Arc<UserRegistry>,
    engine: Arc<RewardEngine>,
    coordinator: Arc<BatchCoordinator>,
    location_tracker: Arc<LocationTracker>,
    ranker: AttractionRanker,
    tracker: Tracker,
    pricer: Arc<dyn TripPricer>,
    metrics: Arc<Metrics>,
}

impl TourGuide {
    pub fn new(config: Config, collaborators: Collaborators, metrics: Arc<Metrics>) -> Self {
        let Collaborators { provider, oracle, pricer } = collaborators;

        let engine = Arc::new(RewardEngine::new(&config, provider.clone(), oracle, metrics.clone()));
        let coordinator = Arc::new(BatchCoordinator::new(
            engine.clone(),
            WorkerPool::new("rewards", config.reward_workers()),
            config.chunk_size(),
            metrics.clone(),
        ));
        let location_tracker = Arc::new(LocationTracker::new(
            provider.clone(),
            engine.clone(),
            coordinator.clone(),
            WorkerPool::new("tracking", config.tracking_workers()),
            config.reward_mode(),
            metrics.clone(),
        ));
        let ranker = AttractionRanker::new(provider, engine.clone(), config.nearby_count());

        let registry = Arc::new(UserRegistry::new());
        if config.internal_users() {
            registry.seed_internal_users(config.internal_user_count(), config.locations_per_user());
        }

        let tracker = Tracker::new(
            location_tracker.clone(),
            registry.clone(),
            metrics.clone(),
            config.tracker_poll_interval(),
        );

        Self { config, registry, engine, coordinator, location_tracker, ranker, tracker, pricer, metrics }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn engine(&self) -> &Arc<RewardEngine> {
        &self.engine
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    // User registry

    /// Register a user; an existing user with the same name is kept
    pub fn add_user(&self, user: User) -> bool {
        self.registry.add(Arc::new(user))
    }

    pub fn get_user(&self, user_name: &str) -> Option<Arc<User>> {
        self.registry.get(user_name)
    }

    /// Like `get_user`, but an unknown name is an error
    pub fn user(&self, user_name: &str) -> Result<Arc<User>> {
        self.registry.get(user_name).ok_or_else(|| Error::UnknownUser(user_name.to_string()))
    }

    pub fn all_users(&self) -> Vec<Arc<User>> {
        self.registry.all()
    }

    // Queries

    pub fn user_rewards(&self, user: &User) -> Vec<UserReward> {
        user.rewards()
    }

    /// Most recent location, tracking the user if it has none yet
    pub async fn user_location(&self, user: &Arc<User>) -> Result<VisitedLocation> {
        self.location_tracker.get_location(user).await
    }

    /// The closest attractions to the user's current location, with points
    pub async fn nearby_attractions(&self, user: &Arc<User>) -> Result<Vec<NearbyAttraction>> {
        let visited = self.user_location(user).await?;
        self.ranker.nearby_attractions(user, &visited).await
    }

    /// Price trips for the user's preferences and store them as the user's deals
    pub async fn trip_deals(&self, user: &User) -> Result<Vec<Provider>> {
        let preferences = user.preferences();
        let reward_points = user.total_reward_points();
        let quote = TripQuote {
            api_key: self.config.trip_pricer_api_key(),
            user_id: user.id(),
            adults: preferences.number_of_adults,
            children: preferences.number_of_children,
            nights: preferences.trip_duration,
            reward_points,
        };

        let deals = self
            .pricer
            .price(quote)
            .await
            .map_err(|source| Error::Pricing { user: user.id(), source })?;

        debug!(user = %user.user_name(), offers = %deals.len(), reward_points = %reward_points, "trip_deals_priced");
        user.set_trip_deals(deals.clone());
        Ok(deals)
    }

    // Tracking and rewards

    pub async fn track_user_location(&self, user: &Arc<User>) -> Result<VisitedLocation> {
        self.location_tracker.track_location(user).await
    }

    /// Track the given users and wait for all resulting reward work
    pub async fn track_users(&self, users: &[Arc<User>]) -> Result<usize> {
        self.location_tracker.track_all(users).await
    }

    /// Track every registered user
    pub async fn track_all_users(&self) -> Result<usize> {
        self.track_users(&self.registry.all()).await
    }

    /// Run a single reward pass for one user, bypassing the batch queue
    pub async fn calculate_rewards(&self, user: &User) -> Result<usize> {
        self.engine.calculate_rewards(user).await
    }

    /// Queue every user for a reward pass and wait for all of them.
    /// Returns the number of chunks processed.
    pub async fn calculate_rewards_for_all(&self, users: &[Arc<User>]) -> Result<usize> {
        let chunks = self.coordinator.enqueue_all(users.iter().cloned());
        info!(users = %users.len(), chunks = %chunks, "reward_calculation_started");
        self.coordinator.join_all().await?;
        Ok(chunks)
    }

    // Lifecycle

    /// Start the background tracker. Returns false if already running.
    pub fn start_tracking(&self) -> bool {
        self.tracker.start()
    }

    pub async fn shutdown(&self) {
        self.tracker.stop().await;
        info!(registered_users = %self.registry.len(), "tour_guide_shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Location, UserId, UserPreferences};
    use crate::io::trip_pricer::OFFERS_PER_QUOTE;
    use crate::testutil::{attraction_north_of, ConstantOracle, FixedGps};

    const HOME: Location = Location { latitude: 33.8, longitude: -117.9 };

    fn tour_guide() -> (TourGuide, Arc<FixedGps>) {
        let gps = Arc::new(FixedGps::new(HOME, vec![attraction_north_of("Castle", HOME, 2.0)]));
        let collaborators = Collaborators {
            provider: gps.clone(),
            oracle: Arc::new(ConstantOracle::new(300)),
            pricer: Arc::new(SimulatedTripPricer),
        };
        let config = Config::default().with_internal_users(0);
        (TourGuide::new(config, collaborators, Arc::new(Metrics::new())), gps)
    }

    fn user(name: &str) -> User {
        User::new(UserId::new(), name, "000", &format!("{name}@tourGuide.com"))
    }

    #[test]
    fn test_unknown_user() {
        let (guide, _) = tour_guide();
        assert!(guide.get_user("ghost").is_none());
        assert!(matches!(guide.user("ghost"), Err(Error::UnknownUser(name)) if name == "ghost"));
    }

    #[test]
    fn test_internal_users_seeded_from_config() {
        let gps = Arc::new(FixedGps::new(HOME, vec![]));
        let collaborators = Collaborators {
            provider: gps,
            oracle: Arc::new(ConstantOracle::new(1)),
            pricer: Arc::new(SimulatedTripPricer),
        };
        let guide = TourGuide::new(Config::default().with_internal_users(7), collaborators, Arc::new(Metrics::new()));
        assert_eq!(guide.all_users().len(), 7);
        assert!(guide.get_user("internalUser6").is_some());
    }

    #[tokio::test]
    async fn test_trip_deals_are_stored() {
        let (guide, _) = tour_guide();
        guide.add_user(user("jon"));
        let jon = guide.user("jon").unwrap();
        jon.set_preferences(UserPreferences { number_of_adults: 2, trip_duration: 3, ..Default::default() });

        let deals = guide.trip_deals(&jon).await.unwrap();
        assert_eq!(deals.len(), OFFERS_PER_QUOTE);
        assert_eq!(jon.trip_deals(), deals);
    }

    #[tokio::test]
    async fn test_track_user_location_then_rewards() {
        let (guide, gps) = tour_guide();
        guide.add_user(user("jon"));
        let jon = guide.user("jon").unwrap();

        let visited = guide.track_user_location(&jon).await.unwrap();
        assert_eq!(visited.location, HOME);
        assert_eq!(gps.location_calls(), 1);

        guide.calculate_rewards_for_all(&[jon.clone()]).await.unwrap();
        let rewards = guide.user_rewards(&jon);
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].reward_points, 300);
    }
}
