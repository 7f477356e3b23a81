//! Session configuration.
//!
//! A [`SimulationConfig`] is fixed for the lifetime of a session and must be
//! identical on every peer. It is usually deserialized from the lobby's
//! JSON game options.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rng::GameSeeds;

/// Default tick length in milliseconds (15 ticks per simulated second).
pub const DEFAULT_TICK_DURATION_MS: u32 = 66;

/// Default interval between end-of-game evaluations.
pub const DEFAULT_END_CHECK_INTERVAL_MS: u32 = 1000;

/// Session-wide simulation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated milliseconds added to the elapsed-time counter per tick.
    pub tick_duration_ms: u32,
    /// Minimum simulated time between end-of-game evaluations.
    pub end_check_interval_ms: u32,
    /// Map width in tiles.
    pub map_width: i32,
    /// Map height in tiles.
    pub map_height: i32,
    /// Session seeds for the random source.
    pub seeds: GameSeeds,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_duration_ms: DEFAULT_TICK_DURATION_MS,
            end_check_interval_ms: DEFAULT_END_CHECK_INTERVAL_MS,
            map_width: 64,
            map_height: 64,
            seeds: GameSeeds::default(),
        }
    }
}

impl SimulationConfig {
    /// Creates a default configuration with the given seeds.
    #[must_use]
    pub fn with_seeds(game: u64, map: u64) -> Self {
        Self {
            seeds: GameSeeds::new(game, map),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_duration_ms == 0 {
            return Err(ConfigError::Invalid("tick_duration_ms must be non-zero".into()));
        }
        if self.map_width <= 0 || self.map_height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "map size must be positive, got {}x{}",
                self.map_width, self.map_height
            )));
        }
        Ok(())
    }
}
