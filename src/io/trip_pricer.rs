//! Trip pricing interface and simulated backend

use crate::domain::types::{Provider, UserId};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

/// Parameters of a trip quote request
#[derive(Debug, Clone)]
pub struct TripQuote<'a> {
    pub api_key: &'a str,
    pub user_id: UserId,
    pub adults: u32,
    pub children: u32,
    pub nights: u32,
    pub reward_points: i64,
}

#[async_trait]
pub trait TripPricer: Send + Sync {
    async fn price(&self, quote: TripQuote<'_>) -> anyhow::Result<Vec<Provider>>;
}

const PROVIDER_NAMES: [&str; 10] = [
    "Holiday Travels",
    "Enterprize Ventures Limited",
    "Sunny Days",
    "FlyAway Trips",
    "United Partners Vacations",
    "Dream Trips",
    "Live Free",
    "Dancing Waves Cruselines and Partners",
    "AdventureCo",
    "Cure-Your-Blues",
];

/// Offers returned per quote
pub const OFFERS_PER_QUOTE: usize = 5;

/// Simulated pricer: random base prices discounted by reward points
#[derive(Default)]
pub struct SimulatedTripPricer;

#[async_trait]
impl TripPricer for SimulatedTripPricer {
    async fn price(&self, quote: TripQuote<'_>) -> anyhow::Result<Vec<Provider>> {
        let mut rng = rand::thread_rng();
        let travellers = f64::from(quote.adults + quote.children);
        let nights = f64::from(quote.nights.max(1));
        let discount = quote.reward_points as f64 / 3.0;

        let offers = PROVIDER_NAMES
            .choose_multiple(&mut rng, OFFERS_PER_QUOTE)
            .map(|name| {
                let base = f64::from(rng.gen_range(100..700u32));
                let price = (base * travellers * nights - discount).max(0.0);
                Provider { name: (*name).to_string(), price, trip_id: Uuid::new_v4() }
            })
            .collect();
        Ok(offers)
    }
}
