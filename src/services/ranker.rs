//! Attraction ranking by distance

use crate::domain::geo::distance_miles;
use crate::domain::types::{Attraction, Location, NearbyAttraction, VisitedLocation};
use crate::domain::user::User;
use crate::error::{Error, Result};
use crate::io::LocationProvider;
use crate::services::rewards::RewardEngine;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedAttraction {
    pub distance_miles: f64,
    pub attraction: Attraction,
}

/// Catalog ordered by ascending distance from an origin.
///
/// Ties keep catalog order. `nearest` can be called any number of times.
#[derive(Debug, Clone)]
pub struct Ranking {
    origin: Location,
    ranked: Vec<RankedAttraction>,
}

impl Ranking {
    pub fn new(origin: Location, catalog: &[Attraction]) -> Self {
        let mut ranked: Vec<RankedAttraction> = catalog
            .iter()
            .map(|attraction| RankedAttraction {
                distance_miles: distance_miles(&origin, &attraction.location),
                attraction: attraction.clone(),
            })
            .collect();
        // sort_by is stable
        ranked.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));
        Self { origin, ranked }
    }

    pub fn origin(&self) -> Location {
        self.origin
    }

    /// The `k` closest attractions, nearest first
    pub fn nearest(&self, k: usize) -> impl Iterator<Item = &RankedAttraction> + '_ {
        self.ranked.iter().take(k)
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Builds nearest-attraction results with reward points filled in
pub struct AttractionRanker {
    provider: Arc<dyn LocationProvider>,
    engine: Arc<RewardEngine>,
    count: usize,
}

impl AttractionRanker {
    pub fn new(provider: Arc<dyn LocationProvider>, engine: Arc<RewardEngine>, count: usize) -> Self {
        Self { provider, engine, count }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub async fn ranking(&self, origin: Location) -> Result<Ranking> {
        let catalog = self.provider.attractions().await.map_err(Error::Catalog)?;
        Ok(Ranking::new(origin, &catalog))
    }

    /// The configured number of attractions closest to `visited`
    pub async fn nearby_attractions(
        &self,
        user: &User,
        visited: &VisitedLocation,
    ) -> Result<Vec<NearbyAttraction>> {
        let ranking = self.ranking(visited.location).await?;

        let mut nearby = Vec::with_capacity(self.count.min(ranking.len()));
        for ranked in ranking.nearest(self.count) {
            let reward_points = self.engine.reward_points(&ranked.attraction, user.id()).await?;
            nearby.push(NearbyAttraction {
                attraction_name: ranked.attraction.name.clone(),
                attraction_location: ranked.attraction.location,
                user_location: visited.location,
                distance_miles: ranked.distance_miles,
                reward_points,
            });
        }
        Ok(nearby)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{Config, Metrics};
    use crate::io::gps::default_catalog;
    use crate::testutil::{attraction_north_of, test_user, ConstantOracle, FixedGps};
    use chrono::Utc;

    const ORIGIN: Location = Location { latitude: 40.0, longitude: -100.0 };

    #[test]
    fn test_ranking_is_sorted_and_complete() {
        let catalog = default_catalog();
        let ranking = Ranking::new(ORIGIN, &catalog);
        assert_eq!(ranking.len(), catalog.len());

        let distances: Vec<f64> = ranking.nearest(usize::MAX).map(|r| r.distance_miles).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_nearest_returns_min_of_k_and_catalog() {
        let catalog: Vec<_> = (1..=3).map(|i| attraction_north_of(&format!("A{i}"), ORIGIN, i as f64)).collect();
        let ranking = Ranking::new(ORIGIN, &catalog);

        assert_eq!(ranking.nearest(5).count(), 3);
        assert_eq!(ranking.nearest(2).count(), 2);
        assert_eq!(ranking.nearest(0).count(), 0);
        // Restartable
        assert_eq!(ranking.nearest(5).count(), 3);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let catalog = vec![
            attraction_north_of("Far", ORIGIN, 9.0),
            attraction_north_of("Twin 1", ORIGIN, 3.0),
            attraction_north_of("Twin 2", ORIGIN, 3.0),
            attraction_north_of("Close", ORIGIN, 1.0),
        ];
        let names: Vec<_> =
            Ranking::new(ORIGIN, &catalog).nearest(4).map(|r| r.attraction.name.clone()).collect();
        assert_eq!(names, vec!["Close", "Twin 1", "Twin 2", "Far"]);
    }

    #[test]
    fn test_empty_catalog() {
        let ranking = Ranking::new(ORIGIN, &[]);
        assert!(ranking.is_empty());
        assert_eq!(ranking.origin(), ORIGIN);
        assert_eq!(ranking.nearest(5).count(), 0);
    }

    #[tokio::test]
    async fn test_nearby_attractions_fills_points() {
        let gps = Arc::new(FixedGps::new(ORIGIN, default_catalog()));
        let oracle = Arc::new(ConstantOracle::new(42));
        let engine = Arc::new(RewardEngine::new(
            &Config::default(),
            gps.clone(),
            oracle.clone(),
            Arc::new(Metrics::new()),
        ));
        let ranker = AttractionRanker::new(gps, engine, 5);
        assert_eq!(ranker.count(), 5);
        let user = test_user("jon");
        let visited = VisitedLocation::new(user.id(), ORIGIN, Utc::now());

        let nearby = ranker.nearby_attractions(&user, &visited).await.unwrap();
        assert_eq!(nearby.len(), 5);
        assert!(nearby.iter().all(|n| n.reward_points == 42 && n.user_location == ORIGIN));
        assert!(nearby.windows(2).all(|w| w[0].distance_miles <= w[1].distance_miles));
        assert_eq!(oracle.calls(), 5);
    }
}
