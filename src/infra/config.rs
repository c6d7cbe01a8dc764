//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::Attraction;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PROXIMITY_BUFFER_MILES: f64 = 10.0;
pub const DEFAULT_ATTRACTION_PROXIMITY_RANGE_MILES: f64 = 200.0;
pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_REWARD_WORKERS: usize = 50;
pub const DEFAULT_TRACKING_WORKERS: usize = 10;
pub const DEFAULT_NEARBY_COUNT: usize = 5;

/// How a tracked location reaches the reward engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardMode {
    /// Enqueue the user on the batch coordinator
    Batched,
    /// Run the reward pass inline before returning the location
    Inline,
}

impl RewardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardMode::Batched => "batched",
            RewardMode::Inline => "inline",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_proximity_buffer")]
    pub proximity_buffer_miles: f64,
    #[serde(default = "default_attraction_proximity_range")]
    pub attraction_proximity_range_miles: f64,
    #[serde(default = "default_reward_mode")]
    pub mode: RewardMode,
}

fn default_proximity_buffer() -> f64 {
    DEFAULT_PROXIMITY_BUFFER_MILES
}

fn default_attraction_proximity_range() -> f64 {
    DEFAULT_ATTRACTION_PROXIMITY_RANGE_MILES
}

fn default_reward_mode() -> RewardMode {
    RewardMode::Batched
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            proximity_buffer_miles: default_proximity_buffer(),
            attraction_proximity_range_miles: default_attraction_proximity_range(),
            mode: default_reward_mode(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { chunk_size: default_chunk_size() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolsConfig {
    #[serde(default = "default_reward_workers")]
    pub reward_workers: usize,
    #[serde(default = "default_tracking_workers")]
    pub tracking_workers: usize,
}

fn default_reward_workers() -> usize {
    DEFAULT_REWARD_WORKERS
}

fn default_tracking_workers() -> usize {
    DEFAULT_TRACKING_WORKERS
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self { reward_workers: default_reward_workers(), tracking_workers: default_tracking_workers() }
    }
}

/// Catalog entry as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct AttractionEntry {
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttractionsConfig {
    #[serde(default = "default_nearby_count")]
    pub nearby_count: usize,
    /// Overrides the built-in catalog when non-empty
    #[serde(default)]
    pub catalog: Vec<AttractionEntry>,
}

fn default_nearby_count() -> usize {
    DEFAULT_NEARBY_COUNT
}

impl Default for AttractionsConfig {
    fn default() -> Self {
        Self { nearby_count: default_nearby_count(), catalog: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_enabled")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_tracker_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    300
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { enabled: default_tracker_enabled(), poll_interval_secs: default_poll_interval_secs() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersConfig {
    /// Seed internal test users at startup
    #[serde(default = "default_internal_users_enabled")]
    pub internal: bool,
    #[serde(default = "default_internal_user_count")]
    pub internal_count: usize,
    #[serde(default = "default_locations_per_user")]
    pub locations_per_user: usize,
}

fn default_internal_users_enabled() -> bool {
    true
}

fn default_internal_user_count() -> usize {
    100
}

fn default_locations_per_user() -> usize {
    3
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            internal: default_internal_users_enabled(),
            internal_count: default_internal_user_count(),
            locations_per_user: default_locations_per_user(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SimulationConfig {
    /// Artificial latency of the simulated GPS provider (ms)
    #[serde(default)]
    pub gps_latency_ms: u64,
    /// Artificial latency of the simulated reward oracle (ms)
    #[serde(default)]
    pub rewards_latency_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripPricerConfig {
    #[serde(default = "default_trip_pricer_api_key")]
    pub api_key: String,
}

fn default_trip_pricer_api_key() -> String {
    "test-server-api-key".to_string()
}

impl Default for TripPricerConfig {
    fn default() -> Self {
        Self { api_key: default_trip_pricer_api_key() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

fn default_metrics_interval_secs() -> u64 {
    10
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub pools: PoolsConfig,
    #[serde(default)]
    pub attractions: AttractionsConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub users: UsersConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub trip_pricer: TripPricerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    proximity_buffer_miles: f64,
    attraction_proximity_range_miles: f64,
    reward_mode: RewardMode,
    chunk_size: usize,
    reward_workers: usize,
    tracking_workers: usize,
    nearby_count: usize,
    catalog: Vec<AttractionEntry>,
    tracker_enabled: bool,
    tracker_poll_interval_secs: u64,
    internal_users: bool,
    internal_user_count: usize,
    locations_per_user: usize,
    gps_latency_ms: u64,
    rewards_latency_ms: u64,
    trip_pricer_api_key: String,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            proximity_buffer_miles: toml_config.rewards.proximity_buffer_miles,
            attraction_proximity_range_miles: toml_config.rewards.attraction_proximity_range_miles,
            reward_mode: toml_config.rewards.mode,
            chunk_size: toml_config.batch.chunk_size.max(1),
            reward_workers: toml_config.pools.reward_workers.max(1),
            tracking_workers: toml_config.pools.tracking_workers.max(1),
            nearby_count: toml_config.attractions.nearby_count,
            catalog: toml_config.attractions.catalog,
            tracker_enabled: toml_config.tracker.enabled,
            tracker_poll_interval_secs: toml_config.tracker.poll_interval_secs.max(1),
            internal_users: toml_config.users.internal,
            internal_user_count: toml_config.users.internal_count,
            locations_per_user: toml_config.users.locations_per_user,
            gps_latency_ms: toml_config.simulation.gps_latency_ms,
            rewards_latency_ms: toml_config.simulation.rewards_latency_ms,
            trip_pricer_api_key: toml_config.trip_pricer.api_key,
            metrics_interval_secs: toml_config.metrics.interval_secs.max(1),
            config_file: config_file.to_string(),
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        // Check for --config argument
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str, origin: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig =
            toml::from_str(content).with_context(|| format!("Failed to parse config {}", origin))?;
        Ok(Self::from_toml(toml_config, origin))
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(Self::resolve_config_path(args))
    }

    /// Attractions defined in the config file, if any
    pub fn catalog(&self) -> Option<Vec<Attraction>> {
        if self.catalog.is_empty() {
            return None;
        }
        Some(
            self.catalog
                .iter()
                .map(|e| Attraction::new(&e.name, &e.city, &e.state, e.latitude, e.longitude))
                .collect(),
        )
    }

    pub fn proximity_buffer_miles(&self) -> f64 {
        self.proximity_buffer_miles
    }

    pub fn attraction_proximity_range_miles(&self) -> f64 {
        self.attraction_proximity_range_miles
    }

    pub fn reward_mode(&self) -> RewardMode {
        self.reward_mode
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn reward_workers(&self) -> usize {
        self.reward_workers
    }

    pub fn tracking_workers(&self) -> usize {
        self.tracking_workers
    }

    pub fn nearby_count(&self) -> usize {
        self.nearby_count
    }

    pub fn tracker_enabled(&self) -> bool {
        self.tracker_enabled
    }

    pub fn tracker_poll_interval(&self) -> Duration {
        Duration::from_secs(self.tracker_poll_interval_secs)
    }

    pub fn internal_users(&self) -> bool {
        self.internal_users
    }

    pub fn internal_user_count(&self) -> usize {
        self.internal_user_count
    }

    pub fn locations_per_user(&self) -> usize {
        self.locations_per_user
    }

    pub fn gps_latency(&self) -> Duration {
        Duration::from_millis(self.gps_latency_ms)
    }

    pub fn rewards_latency(&self) -> Duration {
        Duration::from_millis(self.rewards_latency_ms)
    }

    pub fn trip_pricer_api_key(&self) -> &str {
        &self.trip_pricer_api_key
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    // Builder methods for tests and harnesses

    pub fn with_proximity_buffer_miles(mut self, miles: f64) -> Self {
        self.proximity_buffer_miles = miles;
        self
    }

    pub fn with_reward_mode(mut self, mode: RewardMode) -> Self {
        self.reward_mode = mode;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_reward_workers(mut self, workers: usize) -> Self {
        self.reward_workers = workers.max(1);
        self
    }

    pub fn with_tracking_workers(mut self, workers: usize) -> Self {
        self.tracking_workers = workers.max(1);
        self
    }

    pub fn with_internal_users(mut self, count: usize) -> Self {
        self.internal_users = count > 0;
        self.internal_user_count = count;
        self
    }

    pub fn with_tracker_poll_interval_secs(mut self, secs: u64) -> Self {
        self.tracker_poll_interval_secs = secs.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.proximity_buffer_miles(), 10.0);
        assert_eq!(config.attraction_proximity_range_miles(), 200.0);
        assert_eq!(config.reward_mode(), RewardMode::Batched);
        assert_eq!(config.chunk_size(), 200);
        assert_eq!(config.reward_workers(), 50);
        assert_eq!(config.tracking_workers(), 10);
        assert_eq!(config.nearby_count(), 5);
        assert_eq!(config.tracker_poll_interval(), Duration::from_secs(300));
        assert_eq!(config.internal_user_count(), 100);
        assert_eq!(config.trip_pricer_api_key(), "test-server-api-key");
        assert!(config.catalog().is_none());
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
[batch]
chunk_size = 50

[rewards]
mode = "inline"
"#,
            "inline-test",
        )
        .unwrap();
        assert_eq!(config.chunk_size(), 50);
        assert_eq!(config.reward_mode(), RewardMode::Inline);
        assert_eq!(config.proximity_buffer_miles(), 10.0);
        assert_eq!(config.reward_workers(), 50);
    }

    #[test]
    fn test_zero_sizes_are_clamped() {
        let config = Config::from_toml_str(
            "[batch]\nchunk_size = 0\n[pools]\nreward_workers = 0\ntracking_workers = 0\n",
            "zero",
        )
        .unwrap();
        assert_eq!(config.chunk_size(), 1);
        assert_eq!(config.reward_workers(), 1);
        assert_eq!(config.tracking_workers(), 1);
    }

    #[test]
    fn test_builders_clamp_and_override() {
        let config = Config::default()
            .with_chunk_size(0)
            .with_reward_workers(0)
            .with_tracker_poll_interval_secs(0)
            .with_internal_users(0);
        assert_eq!(config.chunk_size(), 1);
        assert_eq!(config.reward_workers(), 1);
        assert_eq!(config.tracker_poll_interval(), Duration::from_secs(1));
        assert!(!config.internal_users());

        let config = Config::default().with_tracker_poll_interval_secs(45);
        assert_eq!(config.tracker_poll_interval(), Duration::from_secs(45));
    }

    #[test]
    fn test_catalog_override() {
        let config = Config::from_toml_str(
            r#"
[[attractions.catalog]]
name = "Home Base"
latitude = 10.0
longitude = 20.0
"#,
            "catalog",
        )
        .unwrap();
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "Home Base");
        assert_eq!(catalog[0].location.longitude, 20.0);
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        assert!(Config::from_toml_str("[rewards]\nmode = \"sometimes\"\n", "bad").is_err());
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> =
            vec!["tourguide".to_string(), "--config".to_string(), "config/prod.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/prod.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> =
            vec!["tourguide".to_string(), "--config=config/load.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/load.toml");
    }
}
