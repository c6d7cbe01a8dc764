//! Location provider interface and simulated GPS backend
//!
//! The engine only needs two capabilities from a location source: the
//! current position of a user and the attraction catalog. `SimulatedGps`
//! stands in for the real provider in the daemon, load harness and tests.

use crate::domain::types::{Attraction, Location, UserId, VisitedLocation};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Valid latitude range for generated positions (Web Mercator bounds)
pub const MAX_LATITUDE: f64 = 85.05112878;
pub const MAX_LONGITUDE: f64 = 180.0;

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current position of a user
    async fn current_location(&self, user_id: UserId) -> anyhow::Result<VisitedLocation>;

    /// Full attraction catalog
    async fn attractions(&self) -> anyhow::Result<Vec<Attraction>>;
}

/// Random coordinate within the valid latitude/longitude bounds
pub fn random_location<R: Rng + ?Sized>(rng: &mut R) -> Location {
    Location::new(
        rng.gen_range(-MAX_LATITUDE..=MAX_LATITUDE),
        rng.gen_range(-MAX_LONGITUDE..=MAX_LONGITUDE),
    )
}

/// Default attraction catalog
pub fn default_catalog() -> Vec<Attraction> {
    vec![
        Attraction::new("Disneyland", "Anaheim", "CA", 33.817595, -117.922008),
        Attraction::new("Jackson Hole", "Jackson Hole", "WY", 43.582767, -110.821999),
        Attraction::new("Mojave National Preserve", "Kelso", "CA", 35.141689, -115.510399),
        Attraction::new("Joshua Tree National Park", "Joshua Tree National Park", "CA", 33.881866, -115.90065),
        Attraction::new("Buffalo National River", "St Joe", "AR", 35.985512, -92.757652),
        Attraction::new("Hot Springs National Park", "Hot Springs", "AR", 34.52153, -93.042267),
        Attraction::new("Kartchner Caverns State Park", "Benson", "AZ", 31.837551, -110.347382),
        Attraction::new("Legend Valley", "Thornville", "OH", 39.937778, -82.40667),
        Attraction::new("Flowers Bakery of London", "Flowers Bakery of London", "KY", 37.131527, -84.07486),
        Attraction::new("McKinley Tower", "Anchorage", "AK", 61.218887, -149.877502),
        Attraction::new("Flatiron Building", "New York City", "NY", 40.741112, -73.989723),
        Attraction::new("Fallingwater", "Mill Run", "PA", 39.906113, -79.468056),
        Attraction::new("Union Station", "Washington D.C.", "CA", 38.897095, -77.006332),
        Attraction::new("Roger Dean Stadium", "Jupiter", "FL", 26.890959, -80.116577),
        Attraction::new("Texas Memorial Stadium", "Austin", "TX", 30.283682, -97.732536),
        Attraction::new("Bryant-Denny Stadium", "Tuscaloosa", "AL", 33.208973, -87.550438),
        Attraction::new("Tiger Stadium", "Baton Rouge", "LA", 30.412035, -91.183815),
        Attraction::new("Neyland Stadium", "Knoxville", "TN", 35.955013, -83.925011),
        Attraction::new("Kyle Field", "College Station", "TX", 30.61025, -96.339844),
        Attraction::new("San Diego Zoo", "San Diego", "CA", 32.735317, -117.149048),
        Attraction::new("Zoo Tampa at Lowry Park", "Tampa", "FL", 28.012804, -82.469269),
        Attraction::new("Franklin Park Zoo", "Boston", "MA", 42.302601, -71.086731),
        Attraction::new("El Paso Zoo", "El Paso", "TX", 31.769125, -106.44487),
        Attraction::new("Kansas City Zoo", "Kansas City", "MO", 39.007504, -94.529625),
        Attraction::new("Bronx Zoo", "Bronx", "NY", 40.852905, -73.872971),
        Attraction::new("Cinderella Castle", "Orlando", "FL", 28.419411, -81.5812),
    ]
}

/// Simulated GPS backend returning random positions
pub struct SimulatedGps {
    catalog: Vec<Attraction>,
    latency: Duration,
}

impl SimulatedGps {
    pub fn new(catalog: Vec<Attraction>, latency: Duration) -> Self {
        Self { catalog, latency }
    }
}

impl Default for SimulatedGps {
    fn default() -> Self {
        Self::new(default_catalog(), Duration::ZERO)
    }
}

#[async_trait]
impl LocationProvider for SimulatedGps {
    async fn current_location(&self, user_id: UserId) -> anyhow::Result<VisitedLocation> {
        let location = random_location(&mut rand::thread_rng());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        debug!(user = %user_id, location = %location, "gps_location");
        Ok(VisitedLocation::new(user_id, location, Utc::now()))
    }

    async fn attractions(&self) -> anyhow::Result<Vec<Attraction>> {
        Ok(self.catalog.clone())
    }
}
