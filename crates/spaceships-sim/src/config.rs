//! Simulation parameters.
//!
//! Keys are kebab-case so a TOML file reads like the classic
//! `spaceships.properties` (`world-length`, `speed-variance`, ...).

use std::path::PathBuf;

use serde::Deserialize;

use spaceships_core::constants::*;
use spaceships_core::types::Aabb;
use spaceships_index::IndexConfig;

use crate::error::ConfigError;

/// Configuration for starting a new simulation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SimConfig {
    /// RNG seed. Each ship derives its own stream from it.
    pub seed: u64,
    /// Number of ship slots.
    #[serde(alias = "N", alias = "n")]
    pub ships: usize,
    /// World length along x; the world is `WORLD_ASPECT` as tall.
    pub world_length: f64,
    /// Standard deviation of the initial speed around `SPEED_LIMIT / 4`.
    pub speed_variance: f64,
    /// Neighbor interaction range used by the self-update transaction.
    pub radar_range: f64,
    /// Whether renderer snapshots extrapolate positions to query time.
    pub extrapolate: bool,
    pub mailbox_capacity: usize,
    /// Runtime worker threads; `None` keeps the runtime default.
    pub parallelism: Option<usize>,
    /// Directory for `config.txt` and the per-second `times.csv`.
    #[serde(alias = "dir")]
    pub metrics_dir: Option<PathBuf>,
    pub index: IndexConfig,
    pub supervisor: SupervisorConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ships: DEFAULT_SHIP_COUNT,
            world_length: DEFAULT_WORLD_LENGTH,
            speed_variance: 1.0,
            radar_range: DEFAULT_INTERACTION_RANGE,
            extrapolate: true,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            parallelism: None,
            metrics_dir: None,
            index: IndexConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl SimConfig {
    /// World rectangle derived from `world_length`.
    pub fn bounds(&self) -> Aabb {
        Aabb::world(self.world_length, WORLD_ASPECT)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ships == 0 {
            return Err(ConfigError::invalid("ships", "must be at least 1"));
        }
        if !(self.world_length.is_finite() && self.world_length > 0.0) {
            return Err(ConfigError::invalid("world-length", "must be positive"));
        }
        if !(self.speed_variance.is_finite() && self.speed_variance >= 0.0) {
            return Err(ConfigError::invalid("speed-variance", "must be non-negative"));
        }
        if !(self.radar_range.is_finite() && self.radar_range >= 0.0) {
            return Err(ConfigError::invalid("radar-range", "must be non-negative"));
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::invalid("mailbox-capacity", "must be at least 1"));
        }
        if self.parallelism == Some(0) {
            return Err(ConfigError::invalid("parallelism", "must be at least 1"));
        }
        self.index.validate()?;
        Ok(())
    }
}

/// What happens to a slot once its ship task ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    /// Always respawn, keeping the population constant.
    #[default]
    Permanent,
    /// Respawn only ships that failed.
    Transient,
    /// Never respawn.
    Temporary,
}

impl RestartPolicy {
    pub fn restarts(self, failed: bool) -> bool {
        match self {
            RestartPolicy::Permanent => true,
            RestartPolicy::Transient => failed,
            RestartPolicy::Temporary => false,
        }
    }
}

/// One-for-one supervision parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SupervisorConfig {
    pub restart: RestartPolicy,
    /// Restarts allowed within `restart_window_ms` before the slot is abandoned.
    pub max_restarts: u32,
    pub restart_window_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart: RestartPolicy::Permanent,
            max_restarts: 5,
            restart_window_ms: 1000,
        }
    }
}
