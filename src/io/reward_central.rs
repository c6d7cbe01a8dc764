//! Reward oracle interface and simulated backend

use crate::domain::types::{AttractionId, UserId};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

#[async_trait]
pub trait RewardOracle: Send + Sync {
    /// Point value for a (attraction, user) pair
    async fn points_for(&self, attraction_id: AttractionId, user_id: UserId) -> anyhow::Result<i32>;
}

/// Simulated reward service returning random point values in 1..1000
pub struct SimulatedRewardCentral {
    latency: Duration,
}

impl SimulatedRewardCentral {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedRewardCentral {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl RewardOracle for SimulatedRewardCentral {
    async fn points_for(&self, _attraction_id: AttractionId, _user_id: UserId) -> anyhow::Result<i32> {
        let points = rand::thread_rng().gen_range(1..1000);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_points_in_range() {
        let oracle = SimulatedRewardCentral::default();
        for _ in 0..200 {
            let points = oracle.points_for(AttractionId::new(), UserId::new()).await.unwrap();
            assert!((1..1000).contains(&points));
        }
    }
}
