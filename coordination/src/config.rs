//! Coordinator configuration

use common::CoordinationStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Construction-time configuration for the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Heartbeat staleness threshold before a new election is triggered (seconds)
    #[serde(default = "default_election_timeout")]
    pub election_timeout_secs: f64,

    /// Interval between leader heartbeat ticks (seconds)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: f64,

    /// Interval between pending-queue re-scans (seconds)
    #[serde(default = "default_queue_poll_interval")]
    pub queue_poll_interval_secs: f64,

    /// Task allocation strategy
    #[serde(default)]
    pub strategy: CoordinationStrategy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            election_timeout_secs: 5.0,
            heartbeat_interval_secs: 1.0,
            queue_poll_interval_secs: 0.5,
            strategy: CoordinationStrategy::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn election_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.election_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs_f64(self.heartbeat_interval_secs)
    }

    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.queue_poll_interval_secs)
    }
}

fn default_election_timeout() -> f64 {
    5.0
}

fn default_heartbeat_interval() -> f64 {
    1.0
}

fn default_queue_poll_interval() -> f64 {
    0.5
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<CoordinatorConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: CoordinatorConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to TOML file
pub fn save_config(config: &CoordinatorConfig, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
