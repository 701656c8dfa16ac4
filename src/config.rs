//! Server Configuration
//!
//! All tunables of a discovery server. The peer set is fixed at startup and
//! must contain the server's own address; there is no runtime reconfiguration.
//!
//! Defaults can be overridden from the environment:
//! - `GOSSIP_PERIOD_MS`
//! - `GOSSIP_BATCH_SIZE`
//! - `ATTRIBUTES_UPDATE_PERIOD_MS`
//! - `MIN_LEASE_MS`
//! - `MAX_LEASE_MS`

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// This server's identity within `peer_addresses`.
    pub self_address: String,
    /// The full fixed server set, including `self_address`.
    pub peer_addresses: Vec<String>,
    /// Interval between gossip fan-out ticks.
    pub gossip_period: Duration,
    /// Receive-side sub-batch size for applying gossip entries.
    pub gossip_batch_size: usize,
    /// Minimum interval between attribute re-pushes per member.
    pub attributes_update_period: Duration,
    /// Bounds on client-supplied lease durations.
    pub min_lease: Duration,
    pub max_lease: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            self_address: String::new(),
            peer_addresses: Vec::new(),
            gossip_period: Duration::from_secs(1),
            gossip_batch_size: 1000,
            attributes_update_period: Duration::from_secs(60),
            min_lease: Duration::from_secs(1),
            max_lease: Duration::from_secs(300),
        }
    }
}

impl DiscoveryConfig {
    /// Applies environment overrides on top of the current values.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(ms) = env_parse::<u64>("GOSSIP_PERIOD_MS") {
            self.gossip_period = Duration::from_millis(ms);
        }
        if let Some(size) = env_parse::<usize>("GOSSIP_BATCH_SIZE") {
            self.gossip_batch_size = size;
        }
        if let Some(ms) = env_parse::<u64>("ATTRIBUTES_UPDATE_PERIOD_MS") {
            self.attributes_update_period = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("MIN_LEASE_MS") {
            self.min_lease = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("MAX_LEASE_MS") {
            self.max_lease = Duration::from_millis(ms);
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}
