//! Location tracking - fetch, record, hand off for rewards
//!
//! `track_location` asks the provider for a user's position, appends it to
//! the history and then either enqueues the user on the batch coordinator or
//! runs the reward pass inline, depending on the configured `RewardMode`.
//! `track_all` is the bulk variant: it returns only after every location
//! fetch and every downstream reward task has finished.

use crate::domain::types::VisitedLocation;
use crate::domain::user::User;
use crate::error::{Error, Result};
use crate::infra::config::RewardMode;
use crate::infra::metrics::Metrics;
use crate::io::LocationProvider;
use crate::services::batch::BatchCoordinator;
use crate::services::rewards::RewardEngine;
use crate::services::worker_pool::WorkerPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct LocationTracker {
    provider: Arc<dyn LocationProvider>,
    engine: Arc<RewardEngine>,
    coordinator: Arc<BatchCoordinator>,
    pool: WorkerPool,
    mode: RewardMode,
    metrics: Arc<Metrics>,
}

impl LocationTracker {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        engine: Arc<RewardEngine>,
        coordinator: Arc<BatchCoordinator>,
        pool: WorkerPool,
        mode: RewardMode,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { provider, engine, coordinator, pool, mode, metrics }
    }

    pub fn mode(&self) -> RewardMode {
        self.mode
    }

    /// Most recent location, tracking the user first if it has none
    pub async fn get_location(&self, user: &Arc<User>) -> Result<VisitedLocation> {
        match user.last_visited_location() {
            Some(visited) => Ok(visited),
            None => self.track_location(user).await,
        }
    }

    /// Fetch and record the user's current location, then schedule rewards
    pub async fn track_location(&self, user: &Arc<User>) -> Result<VisitedLocation> {
        let visited = record_location(self.provider.as_ref(), &self.metrics, user).await?;

        match self.mode {
            RewardMode::Batched => {
                self.coordinator.enqueue(user.clone());
            }
            RewardMode::Inline => {
                self.engine.calculate_rewards(user).await?;
            }
        }
        Ok(visited)
    }

    /// Track every user and wait for all resulting work to finish.
    ///
    /// Returns the number of users whose location was recorded. Provider and
    /// reward failures are collected and returned together once everything
    /// has settled.
    pub async fn track_all(&self, users: &[Arc<User>]) -> Result<usize> {
        let start = Instant::now();

        let handles: Vec<_> = users
            .iter()
            .map(|user| {
                let provider = self.provider.clone();
                let metrics = self.metrics.clone();
                let engine = self.engine.clone();
                let mode = self.mode;
                let user = user.clone();
                self.pool.spawn(async move {
                    record_location(provider.as_ref(), &metrics, &user).await?;
                    if mode == RewardMode::Inline {
                        engine.calculate_rewards(&user).await?;
                    }
                    Ok(user)
                })
            })
            .collect();

        let mut tracked = 0;
        let mut failures = Vec::new();
        let mut interrupted = false;
        for handle in handles {
            match handle.await {
                Ok(Ok(user)) => {
                    tracked += 1;
                    if self.mode == RewardMode::Batched {
                        self.coordinator.defer(user);
                    }
                }
                Ok(Err(e)) => failures.push(e),
                Err(e) if e.is_cancelled() => interrupted = true,
                Err(e) => failures.push(Error::TaskPanicked(e.to_string())),
            }
        }

        let chunks = self.coordinator.flush();
        match self.coordinator.join_all().await {
            Ok(_) => {}
            Err(Error::Interrupted) => interrupted = true,
            Err(Error::TasksFailed(batch_failures)) => failures.extend(batch_failures),
            Err(e) => failures.push(e),
        }

        if interrupted {
            return Err(Error::Interrupted);
        }

        info!(
            users = %users.len(),
            tracked = %tracked,
            chunks = %chunks,
            failures = %failures.len(),
            elapsed_ms = %start.elapsed().as_millis(),
            "track_all_completed"
        );

        if failures.is_empty() {
            Ok(tracked)
        } else {
            Err(Error::TasksFailed(failures))
        }
    }
}

/// Ask the provider for the user's position and append it to the history
async fn record_location(
    provider: &dyn LocationProvider,
    metrics: &Metrics,
    user: &User,
) -> Result<VisitedLocation> {
    let visited = match provider.current_location(user.id()).await {
        Ok(visited) => visited,
        Err(source) => {
            metrics.record_location_failure();
            warn!(user = %user.user_name(), error = %source, "location_lookup_failed");
            return Err(Error::Location { user: user.id(), source });
        }
    };

    user.add_visited_location(visited.clone());
    metrics.record_location_tracked();
    debug!(user = %user.user_name(), location = %visited.location, "location_tracked");
    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Location;
    use crate::infra::Config;
    use crate::testutil::{attraction_north_of, test_user, ConstantOracle, FixedGps};

    const HOME: Location = Location { latitude: 47.6, longitude: -122.3 };

    struct Fixture {
        tracker: LocationTracker,
        gps: Arc<FixedGps>,
        oracle: Arc<ConstantOracle>,
        metrics: Arc<Metrics>,
    }

    fn fixture(mode: RewardMode, chunk_size: usize) -> Fixture {
        let gps = Arc::new(FixedGps::new(HOME, vec![attraction_north_of("Needle", HOME, 5.0)]));
        let oracle = Arc::new(ConstantOracle::new(100));
        let metrics = Arc::new(Metrics::new());
        let engine = Arc::new(RewardEngine::new(
            &Config::default(),
            gps.clone(),
            oracle.clone(),
            metrics.clone(),
        ));
        let coordinator = Arc::new(BatchCoordinator::new(
            engine.clone(),
            WorkerPool::new("rewards", 4),
            chunk_size,
            metrics.clone(),
        ));
        let tracker = LocationTracker::new(
            gps.clone(),
            engine,
            coordinator,
            WorkerPool::new("tracking", 2),
            mode,
            metrics.clone(),
        );
        Fixture { tracker, gps, oracle, metrics }
    }

    #[tokio::test]
    async fn test_get_location_without_history_calls_provider_once() {
        let f = fixture(RewardMode::Batched, 200);
        let user = test_user("jon");

        let visited = f.tracker.get_location(&user).await.unwrap();
        assert_eq!(f.gps.location_calls(), 1);
        assert_eq!(visited.user_id, user.id());
        assert_eq!(visited.location, HOME);

        // Second call is served from history
        let again = f.tracker.get_location(&user).await.unwrap();
        assert_eq!(again, visited);
        assert_eq!(f.gps.location_calls(), 1);
    }

    #[tokio::test]
    async fn test_track_location_inline_awards_before_returning() {
        let f = fixture(RewardMode::Inline, 200);
        let user = test_user("jon");

        f.tracker.track_location(&user).await.unwrap();

        let rewards = user.rewards();
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].reward_points, 100);
    }

    #[tokio::test]
    async fn test_track_location_batched_awards_after_join() {
        let f = fixture(RewardMode::Batched, 200);
        let user = test_user("jon");

        f.tracker.track_location(&user).await.unwrap();
        f.tracker.coordinator.join_all().await.unwrap();

        assert_eq!(user.reward_count(), 1);
        assert_eq!(user.rewards()[0].reward_points, 100);
        assert_eq!(f.metrics.locations_tracked(), 1);
    }

    #[tokio::test]
    async fn test_track_all_waits_for_rewards() {
        let f = fixture(RewardMode::Batched, 200);
        let users: Vec<_> = (0..450).map(|i| test_user(&format!("user{i}"))).collect();

        assert_eq!(f.tracker.track_all(&users).await.unwrap(), 450);

        assert!(users.iter().all(|u| u.visited_location_count() == 1));
        assert!(users.iter().all(|u| u.reward_count() == 1));
        assert_eq!(f.metrics.batches_submitted(), 3);
        assert_eq!(f.oracle.calls(), 450);
    }

    #[tokio::test]
    async fn test_track_all_inline() {
        let f = fixture(RewardMode::Inline, 200);
        let users: Vec<_> = (0..20).map(|i| test_user(&format!("user{i}"))).collect();

        assert_eq!(f.tracker.track_all(&users).await.unwrap(), 20);
        assert!(users.iter().all(|u| u.reward_count() == 1));
        assert_eq!(f.metrics.batches_submitted(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_surfaced() {
        let f = fixture(RewardMode::Batched, 200);
        f.gps.fail_locations(true);
        let users: Vec<_> = (0..3).map(|i| test_user(&format!("user{i}"))).collect();

        let err = f.tracker.track_all(&users).await.unwrap_err();
        assert_eq!(err.failure_count(), 3);
        assert!(users.iter().all(|u| u.visited_location_count() == 0));
        assert_eq!(f.metrics.location_failures(), 3);

        let single = f.tracker.track_location(&users[0]).await.unwrap_err();
        assert!(matches!(single, Error::Location { .. }));
    }
}
